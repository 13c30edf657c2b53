use anyhow::{bail, Context, Result};
use babi::{load_task, vectorize, CorpusStats, Example, Vocab};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Inspect a bAbI task the way the trainer sees it", long_about = None)]
struct Cli {
    /// Directory containing bAbI tasks
    #[arg(long, default_value = "data/tasks_1-20_v1-2/en/")]
    data_dir: PathBuf,

    /// bAbI task id, 1 <= id <= 20
    #[arg(long, default_value_t = 1)]
    task_id: u32,

    /// Maximum size of memory
    #[arg(long, default_value_t = 30)]
    memory_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print corpus sizes
    Stats,
    /// Print the word index as JSON
    Vocab,
    /// Print the vectorized form of one example
    Encode {
        /// Example index within its file
        #[arg(short, long)]
        index: usize,

        /// Take the example from the test file instead of the train file
        #[arg(long)]
        test: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let (train, test) = load_task(&cli.data_dir, cli.task_id)
        .with_context(|| format!("Failed to load task {} from {:?}", cli.task_id, cli.data_dir))?;
    let vocab = Vocab::build(train.iter().chain(&test));
    let stats = CorpusStats::compute(train.iter().chain(&test), &vocab, cli.memory_size)?;

    match cli.command {
        Commands::Stats => {
            println!("Train examples: {}", train.len());
            println!("Test examples: {}", test.len());
            println!("Vocabulary size (with nil): {}", stats.vocab_size);
            println!("Longest sentence length: {}", stats.sentence_size);
            println!("Longest query length: {}", stats.query_size);
            println!("Longest story length: {}", stats.max_story_size);
            println!("Average story length: {}", stats.mean_story_size);
            println!("Memory size: {}", stats.memory_size);
        }
        Commands::Vocab => {
            println!("{}", serde_json::to_string_pretty(&vocab)?);
        }
        Commands::Encode { index, test: from_test } => {
            let source: &[Example] = if from_test { &test } else { &train };
            let Some(example) = source.get(index) else {
                bail!("Example {} out of range, file has {}", index, source.len());
            };
            let encoded = vectorize(
                std::slice::from_ref(example),
                &vocab,
                stats.sentence_size,
                stats.memory_size,
            )?;

            println!("Query: {}", example.query.join(" "));
            println!("Answer: {} -> label {}", example.answer.join(" "), encoded.labels()[0]);
            println!("Memory:");
            for slot in encoded.story(0).chunks(stats.sentence_size.max(1)) {
                println!("  {:?}", slot);
            }
            println!("Query ids: {:?}", encoded.query(0));
        }
    }

    Ok(())
}
