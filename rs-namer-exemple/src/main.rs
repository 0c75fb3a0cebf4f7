use std::sync::Arc;

use log::info;
use rs_namer_core::config::{ModelConfig, RenamerConfig, ThresholdConfig};
use rs_namer_core::io::read_corpus;
use rs_namer_core::model::{CorpusUnit, NGramLanguageModel};
use rs_namer_core::ranking::{SnippetScorer, most_unnatural};
use rs_namer_core::renaming::{GrammarPrior, RenamerResources, ScoringStrategy};
use rs_namer_core::scope::{FlatScopeExtractor, Scope, ScopeKind};
use rs_namer_core::token::CodeTokenizer;

/// Small built-in corpus used when no directory is given.
fn demo_corpus() -> Vec<CorpusUnit> {
    let mut units = Vec::new();
    for i in 0..50 {
        units.push(CorpusUnit::new(
            format!("counter{i}.c"),
            "int count = 0; for (int i = 0; i < size; i++) { count = count + 1; } return count;",
        ));
        units.push(CorpusUnit::new(
            format!("sum{i}.c"),
            "int total = 0; for (int i = 0; i < size; i++) { total = total + values[i]; } return total;",
        ));
    }
    units.push(CorpusUnit::new(
        "odd.c",
        "int cnt = 0; for (int i = 0; i < size; i++) { cnt = cnt + 1; } return cnt;",
    ));
    units
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // Train on the files of the directory given as first argument ("c" files),
    // or on the built-in corpus
    let units = match std::env::args().nth(1) {
        Some(dir) => read_corpus(dir, "c")?,
        None => demo_corpus(),
    };

    // Words seen only once are kept in the vocabulary for this tiny corpus
    let config = ModelConfig { vocabulary_cutoff: 0, ..ModelConfig::default() };
    let outcome = NGramLanguageModel::train(&config, &CodeTokenizer, &units)?;
    for skipped in &outcome.skipped {
        println!("Skipped {}: {}", skipped.name, skipped.reason);
    }
    let model = Arc::new(outcome.model);
    info!("Vocabulary size: {}", model.vocabulary().len());

    // The flat extractor sees each unit as one variable scope
    let extractor = Arc::new(FlatScopeExtractor::new(CodeTokenizer, ScopeKind::Variable));

    // Strategies are picked by name; the grammar prior is learnt from the same corpus
    let grammar = Arc::new(GrammarPrior::build(extractor.as_ref(), &units, config.chunk_factor));
    let resources = RenamerResources::new(model, Arc::new(CodeTokenizer)).with_grammar_prior(grammar);
    let strategy: ScoringStrategy = "base".parse()?;
    let renamer = Arc::new(strategy.build(&resources, RenamerConfig::default())?);

    // Rank the names of a single identifier
    let scope = Scope::new("int cnt = 0; cnt = cnt + 1;", ScopeKind::Variable);
    println!("Renamings of 'cnt':");
    for renaming in renamer.rank(&scope, "cnt").iter().take(5) {
        println!("  {renaming}");
    }

    // Score whole units and list the least natural ones
    let scorer = SnippetScorer::new(renamer, extractor, ThresholdConfig::default())?;
    let ranked = scorer.rank_units(&units);
    println!("Most unnatural units:");
    for unit in most_unnatural(&ranked, 0.1) {
        println!(
            "  {} score:{:.3} log2 P(no rename):{:.3} {}",
            unit.name,
            unit.suggestions.score,
            unit.suggestions.log_prob_not_renaming(),
            unit.suggestions
        );
    }

    Ok(())
}
