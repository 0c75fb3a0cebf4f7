use std::collections::BTreeSet;
use std::sync::Arc;

use rs_namer_core::config::{ModelConfig, RenamerConfig, ThresholdConfig};
use rs_namer_core::model::{CorpusUnit, LanguageModel, NGram, NGramLanguageModel, UNK_SYMBOL};
use rs_namer_core::ranking::{SnippetScorer, evaluate_perturbations};
use rs_namer_core::renaming::{GrammarPrior, IdentifierRenamer, Renaming, RenamerResources, ScoringStrategy};
use rs_namer_core::scope::{FlatScopeExtractor, Scope, ScopeExtractor, ScopeKind};
use rs_namer_core::token::CodeTokenizer;

const COUNT_UNIT: &str = "int count = 0; count = count + 1;";
const CNT_UNIT: &str = "int cnt = 0; cnt = cnt + 1;";

fn count_corpus() -> Vec<CorpusUnit> {
	let mut units: Vec<CorpusUnit> = (0..100).map(|i| CorpusUnit::new(format!("count{i}"), COUNT_UNIT)).collect();
	units.push(CorpusUnit::new("cnt", CNT_UNIT));
	units
}

fn train(units: &[CorpusUnit]) -> Arc<NGramLanguageModel> {
	Arc::new(NGramLanguageModel::train(&ModelConfig::default(), &CodeTokenizer, units).unwrap().model)
}

fn base_renamer(model: Arc<NGramLanguageModel>, config: RenamerConfig) -> IdentifierRenamer {
	IdentifierRenamer::new(model, Arc::new(CodeTokenizer), config).unwrap()
}

fn scored_names(renamings: &BTreeSet<Renaming>) -> Vec<(String, u64)> {
	renamings.iter().map(|r| (r.name.clone(), r.score.to_bits())).collect()
}

#[test]
fn test_frequent_name_ranks_ahead_of_rare_one() {
	let renamer = base_renamer(train(&count_corpus()), RenamerConfig::default());
	let scope = Scope::new(CNT_UNIT, ScopeKind::Variable);
	let ranking = renamer.rank(&scope, "cnt");

	let score_of = |name: &str| ranking.iter().find(|r| r.name == name).map(|r| r.score).unwrap();
	assert!(score_of("count") < score_of("cnt"));
	assert_eq!(ranking.first().unwrap().name, "count");

	let gap = SnippetScorer::confidence_gap(&ranking, "cnt", true).unwrap();
	assert!(gap > 0.0);
}

#[test]
fn test_identifier_absent_from_scope() {
	let renamer = base_renamer(train(&count_corpus()), RenamerConfig::default());
	let scope = Scope::new(COUNT_UNIT, ScopeKind::Variable);
	let ranking = renamer.rank(&scope, "absent");

	let names: BTreeSet<&str> = ranking.iter().map(|r| r.name.as_str()).collect();
	assert_eq!(names, BTreeSet::from(["absent", UNK_SYMBOL]));
	assert!(ranking.iter().all(|r| r.score.is_finite() && r.score > 0.0));
}

#[test]
fn test_disabled_priors_match_base_ranking() {
	let units = count_corpus();
	let model = train(&units);
	let extractor = FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable);
	let grammar = Arc::new(GrammarPrior::build(&extractor, &units, 2));
	let resources = RenamerResources::new(model, Arc::new(CodeTokenizer)).with_grammar_prior(grammar);

	let base = ScoringStrategy::Base.build(&resources, RenamerConfig::default()).unwrap();
	let no_priors = ScoringStrategy::AllPriors { use_grammar: false, use_types: false }
		.build(&resources, RenamerConfig::default())
		.unwrap();

	let scope = Scope::new(CNT_UNIT, ScopeKind::Variable).with_categories("unit", "");
	assert_eq!(scored_names(&base.rank(&scope, "cnt")), scored_names(&no_priors.rank(&scope, "cnt")));
}

#[test]
fn test_grammar_prior_changes_scores() {
	let units = count_corpus();
	let extractor = FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable);
	let grammar = Arc::new(GrammarPrior::build(&extractor, &units, 2));
	let resources = RenamerResources::new(train(&units), Arc::new(CodeTokenizer)).with_grammar_prior(grammar);
	let renamer = ScoringStrategy::GrammarPrior.build_default(&resources).unwrap();

	let scope = Scope::new(CNT_UNIT, ScopeKind::Variable).with_categories("unit", "");
	let ranking = renamer.rank(&scope, "cnt");
	assert_eq!(ranking.first().unwrap().name, "count");
	assert!(ranking.iter().any(|r| r.name == UNK_SYMBOL));
}

#[test]
fn test_training_is_order_independent() {
	let mut units = count_corpus();
	units.push(CorpusUnit::new("loop", "for (int i = 0; i < n; i++) { total = total + i; }"));
	let forward = train(&units);
	units.reverse();
	let reversed = train(&units);
	assert_eq!(*forward, *reversed);

	let scope = Scope::new(CNT_UNIT, ScopeKind::Variable);
	let a = base_renamer(forward, RenamerConfig::default()).rank(&scope, "cnt");
	let b = base_renamer(reversed, RenamerConfig::default()).rank(&scope, "cnt");
	assert_eq!(scored_names(&a), scored_names(&b));
}

#[test]
fn test_backoff_identity() {
	let model = train(&count_corpus());
	let unseen = NGram::new(vec!["cnt".into(), "=".into(), "count".into()]).unwrap();
	assert_eq!(model.count(&unseen), 0);
	let suffix = NGram::new(vec!["=".into(), "count".into()]).unwrap();
	assert_eq!(model.probability(&unseen), model.backoff_factor() * model.probability(&suffix));
}

#[test]
fn test_candidate_pool_is_bounded() {
	let units: Vec<CorpusUnit> = (0..30).map(|i| CorpusUnit::new(format!("u{i}"), format!("int name{i} = 0; int name{i} = 1;"))).collect();
	let config = RenamerConfig { max_candidates: 3, ..RenamerConfig::default() };
	let renamer = base_renamer(train(&units), config);

	let scope = Scope::new("int current = 0;", ScopeKind::Variable);
	let contexts = renamer.snippet_contexts(&scope.snippet, "current").unwrap();
	let pool = renamer.candidate_pool(&contexts, "current");
	assert_eq!(pool.len(), 5);
	assert!(pool.contains("current"));
	assert!(pool.contains(UNK_SYMBOL));

	let ranking = renamer.rank(&scope, "current");
	assert!(!ranking.is_empty() && ranking.len() <= 5);
	assert!(ranking.iter().any(|r| r.name == UNK_SYMBOL));
}

#[test]
fn test_filtering_is_idempotent_on_real_rankings() {
	let renamer = base_renamer(train(&count_corpus()), RenamerConfig::default());
	let scope = Scope::new(CNT_UNIT, ScopeKind::Variable);
	let ranking = renamer.rank(&scope, "cnt");

	for threshold in [0.5, 1.0, 6.0] {
		let once = SnippetScorer::apply_threshold(&ranking, threshold, 2);
		let twice = SnippetScorer::apply_threshold(&once, threshold, 2);
		assert_eq!(scored_names(&once), scored_names(&twice));
		assert!(once.iter().any(|r| r.name == UNK_SYMBOL));
	}
}

#[test]
fn test_unit_triage() {
	let units = count_corpus();
	let renamer = Arc::new(base_renamer(train(&units), RenamerConfig::default()));
	let extractor = Arc::new(FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable));
	let scorer = SnippetScorer::new(renamer, extractor, ThresholdConfig::default()).unwrap();

	let ranked = scorer.rank_units(&[CorpusUnit::new("count", COUNT_UNIT), CorpusUnit::new("cnt", CNT_UNIT)]);
	assert_eq!(ranked[0].name, "cnt");
	assert!(ranked[0].suggestions.score > 0.0);
	assert_eq!(ranked[1].suggestions.score, 0.0);
	assert!(ranked[0].suggestions.log_prob_not_renaming() < 0.0);
}

#[test]
fn test_interpolated_strategy_ranks() {
	let global = train(&count_corpus());
	let local = train(&[CorpusUnit::new("local", CNT_UNIT)]);
	let resources = RenamerResources::new(local, Arc::new(CodeTokenizer)).with_global_model(global);
	let renamer = ScoringStrategy::Interpolated { lambda: 0.5 }.build_default(&resources).unwrap();

	let ranking = renamer.rank(&Scope::new(CNT_UNIT, ScopeKind::Variable), "cnt");
	let names: BTreeSet<&str> = ranking.iter().map(|r| r.name.as_str()).collect();
	assert!(names.contains("cnt"));
	assert!(names.contains(UNK_SYMBOL));
}

#[test]
fn test_perturbation_ranks_junk_names() {
	let mut units = count_corpus();
	units.extend((0..50).map(|i| CorpusUnit::new(format!("sum{i}"), "int total = size; total = total + size;")));
	let renamer = Arc::new(base_renamer(train(&units), RenamerConfig::default()));
	let extractor = FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable);
	let occurrences = extractor.extract("int total = size; total = total + size;").unwrap();
	assert_eq!(occurrences.len(), 2);

	let scorer = SnippetScorer::new(renamer, Arc::new(extractor), ThresholdConfig::default()).unwrap();
	let stats = evaluate_perturbations(&scorer, &occurrences, "junk1");
	assert_eq!(stats.total(), 2);
	assert_eq!(stats.hit_rate(2), 1.0);
}
