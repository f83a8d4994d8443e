use clap::Parser;
use kaiwa::api::types::{StoryboardDocument, WireBlock, WireInteraction, WireLogic};
use kaiwa::data::{AnswerScript, ScriptedAnswer, ScriptedChoice, ScriptedFile};
use kaiwa::logic::{Comparison, Condition, ConditionOperator};
use kaiwa::storyboard::BlockKind;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fs;

/// A CLI tool to generate storyboard documents and matching answer scripts
/// for the kaiwa runtime
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// The path to write the generated storyboard JSON file to
    #[arg(short, long, default_value = "generated_storyboard.json")]
    output: String,

    /// The path to write the generated answer script JSON file to
    #[arg(long, default_value = "generated_script.json")]
    script_output: String,

    /// Number of middle blocks between the opening choice and the outro
    #[arg(long, default_value_t = 6)]
    blocks: usize,

    /// How many of the middle blocks are wrapped in a gated group
    #[arg(long, default_value_t = 2)]
    grouped: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    if cli.grouped > cli.blocks {
        eprintln!(
            "Error: --grouped ({}) cannot be greater than --blocks ({})",
            cli.grouped, cli.blocks
        );
        std::process::exit(1);
    }

    println!(
        "Generating storyboard ({} middle blocks, {} grouped)...",
        cli.blocks, cli.grouped
    );

    let document = generate_storyboard(&mut rng, cli.blocks, cli.grouped);
    let script = generate_script(&mut rng, &document);

    let document_json = serde_json::to_string_pretty(&document)?;
    fs::write(&cli.output, document_json)?;
    println!("Saved storyboard to '{}'", cli.output);

    let script_json = serde_json::to_string_pretty(&script)?;
    fs::write(&cli.script_output, script_json)?;
    println!("Saved answer script to '{}'", cli.script_output);

    Ok(())
}

/// Layout: an opening yes/no choice, `middle` random blocks (the first
/// `grouped` of them inside a group only visible after answering "Yes"),
/// and an outro message. The choice carries a goto rule that jumps straight
/// to the outro on "No".
fn generate_storyboard(rng: &mut StdRng, middle: usize, grouped: usize) -> StoryboardDocument {
    let mut blocks = Vec::new();
    let mut sequence = 0i64;

    blocks.push(WireBlock {
        id: "intro-choice".to_string(),
        kind: BlockKind::Radio,
        is_required: true,
        is_disabled: false,
        options: label_options("Want to tell us more?"),
        interactions: vec![
            choice_interaction("intro-choice-yes", "Yes", 0),
            choice_interaction("intro-choice-no", "No", 1),
        ],
        logics: vec![WireLogic {
            condition: Condition::Cmp(Comparison {
                block: "intro-choice".to_string(),
                interaction: None,
                operator: ConditionOperator::Eq,
                operand: serde_json::Value::String("No".to_string()),
            }),
            target: "outro".to_string(),
        }],
        sequence,
        parent_block: None,
    });
    sequence += 1;

    if grouped > 0 {
        let mut options = label_options("A few details");
        let gate = Condition::Cmp(Comparison {
            block: "intro-choice".to_string(),
            interaction: None,
            operator: ConditionOperator::Eq,
            operand: serde_json::Value::String("Yes".to_string()),
        });
        if let Ok(value) = serde_json::to_value(&gate) {
            options.insert("visible_when".to_string(), value);
        }
        blocks.push(WireBlock {
            id: "details".to_string(),
            kind: BlockKind::Group,
            is_required: false,
            is_disabled: false,
            options,
            interactions: vec![],
            logics: vec![],
            sequence,
            parent_block: None,
        });
        sequence += 1;
    }

    for position in 0..middle {
        let id = format!("question-{}", position + 1);
        let parent = (position < grouped).then(|| "details".to_string());
        blocks.push(random_block(rng, &id, sequence, parent));
        sequence += 1;
    }

    blocks.push(WireBlock {
        id: "outro".to_string(),
        kind: BlockKind::None,
        is_required: false,
        is_disabled: false,
        options: label_options("Thanks, that's everything."),
        interactions: vec![],
        logics: vec![],
        sequence,
        parent_block: None,
    });

    StoryboardDocument { blocks }
}

fn random_block(
    rng: &mut StdRng,
    id: &str,
    sequence: i64,
    parent_block: Option<String>,
) -> WireBlock {
    let kind = match rng.random_range(0..6) {
        0 => BlockKind::Short,
        1 => BlockKind::Number,
        2 => BlockKind::Checkbox,
        3 => BlockKind::Rating,
        4 => BlockKind::File,
        _ => BlockKind::Long,
    };
    let interactions = match kind {
        BlockKind::Checkbox => (0..3)
            .map(|choice| {
                choice_interaction(
                    &format!("{id}-opt-{choice}"),
                    CHOICE_LABELS[choice],
                    choice as i64,
                )
            })
            .collect(),
        _ => vec![WireInteraction {
            id: format!("{id}-input"),
            label: String::new(),
            sequence: 0,
            is_disabled: false,
            options: serde_json::Map::new(),
        }],
    };
    WireBlock {
        id: id.to_string(),
        kind,
        is_required: rng.random_bool(0.3),
        is_disabled: false,
        options: label_options(&format!("Question {id}")),
        interactions,
        logics: vec![],
        sequence,
        parent_block,
    }
}

/// Generates answers for every leaf so a replay walks the entire queue.
/// The opening choice answers "Yes" most of the time; a "No" run exercises
/// the goto jump instead.
fn generate_script(rng: &mut StdRng, document: &StoryboardDocument) -> AnswerScript {
    let mut steps = Vec::new();
    for block in &document.blocks {
        match block.kind {
            BlockKind::Group | BlockKind::None => continue,
            BlockKind::Radio => {
                let choice = if rng.random_bool(0.8) { 0 } else { 1 };
                let interaction = &block.interactions[choice.min(block.interactions.len() - 1)];
                steps.push(ScriptedAnswer::Value {
                    block: block.id.clone(),
                    interaction: interaction.id.clone(),
                    value: serde_json::Value::String(interaction.label.clone()),
                });
            }
            BlockKind::Checkbox => {
                let picked = rng.random_range(1..=block.interactions.len().max(1));
                steps.push(ScriptedAnswer::Multi {
                    block: block.id.clone(),
                    interactions: block
                        .interactions
                        .iter()
                        .take(picked)
                        .map(|interaction| ScriptedChoice {
                            interaction: interaction.id.clone(),
                            value: serde_json::Value::String(interaction.label.clone()),
                        })
                        .collect(),
                });
            }
            BlockKind::File => {
                let file_count = rng.random_range(1..=2);
                steps.push(ScriptedAnswer::Files {
                    block: block.id.clone(),
                    interaction: format!("{}-input", block.id),
                    files: (0..file_count)
                        .map(|index| ScriptedFile {
                            file_name: format!("{}-{}.pdf", block.id, index),
                            size_bytes: rng.random_range(1_024..100_000),
                        })
                        .collect(),
                });
            }
            BlockKind::Number | BlockKind::Rating => {
                steps.push(ScriptedAnswer::Value {
                    block: block.id.clone(),
                    interaction: format!("{}-input", block.id),
                    value: serde_json::Value::from(rng.random_range(1..=10)),
                });
            }
            _ => {
                steps.push(ScriptedAnswer::Value {
                    block: block.id.clone(),
                    interaction: format!("{}-input", block.id),
                    value: serde_json::Value::String(
                        SAMPLE_ANSWERS[rng.random_range(0..SAMPLE_ANSWERS.len())].to_string(),
                    ),
                });
            }
        }
    }
    AnswerScript { steps }
}

fn label_options(label: &str) -> serde_json::Map<String, serde_json::Value> {
    let mut options = serde_json::Map::new();
    options.insert(
        "label".to_string(),
        serde_json::Value::String(label.to_string()),
    );
    options
}

fn choice_interaction(id: &str, label: &str, sequence: i64) -> WireInteraction {
    WireInteraction {
        id: id.to_string(),
        label: label.to_string(),
        sequence,
        is_disabled: false,
        options: serde_json::Map::new(),
    }
}

const CHOICE_LABELS: [&str; 3] = ["Olives", "Mushrooms", "Peppers"];

const SAMPLE_ANSWERS: [&str; 5] = [
    "Sounds good",
    "Not sure yet",
    "Tell me more",
    "Works on my machine",
    "Ship it",
];
