use clap::Parser;
use kaiwa::prelude::*;
use std::fs;
use std::io::{self, Write};
use std::sync::Arc;
use std::time::Instant;

/// A conversational form runtime CLI: walk a storyboard block by block,
/// scripted or by hand, against an in-memory backend.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the storyboard document JSON file
    storyboard_path: Option<String>,

    /// Optional path to a public form descriptor JSON file
    #[arg(short, long)]
    form: Option<String>,

    /// Optional path to an answer script JSON file for replay
    #[arg(short, long)]
    script: Option<String>,

    /// Preview only: no backend session, submission is skipped
    #[arg(short, long)]
    dry_run: bool,

    /// Run in interactive mode to be prompted for answers
    #[arg(short = 'i', long, help = "Run in interactive 'human' mode")]
    human: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();
    let cli = Cli::parse();

    let storyboard_path = match &cli.storyboard_path {
        Some(path) => path.clone(),
        None if cli.human => prompt_for_input("Enter storyboard path", Some("data/storyboard.json")),
        None => exit_with_error("Storyboard path is required in non-interactive mode."),
    };

    // --- 1. File Loading ---
    let load_start = Instant::now();
    let document_json = fs::read_to_string(&storyboard_path).unwrap_or_else(|e| {
        exit_with_error(&format!(
            "Failed to read storyboard file '{}': {}",
            &storyboard_path, e
        ))
    });
    let document: StoryboardDocument = serde_json::from_str(&document_json)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse storyboard JSON: {}", e)));

    let form = match &cli.form {
        Some(path) => {
            let form_json = fs::read_to_string(path).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to read form file '{}': {}", path, e))
            });
            serde_json::from_str(&form_json)
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to parse form JSON: {}", e)))
        }
        None => PublicForm {
            uuid: uuid::Uuid::new_v4().to_string(),
            title: "Untitled form".to_string(),
            ..PublicForm::default()
        },
    };

    let script = match &cli.script {
        Some(path) => AnswerScript::from_file(path).unwrap_or_else(|e| {
            exit_with_error(&format!("Failed to load answer script from '{}': {}", path, e))
        }),
        None if !cli.human => {
            println!("No answer script provided. Using sample script.");
            AnswerScript::sample()
        }
        None => AnswerScript::default(),
    };
    let load_duration = load_start.elapsed();

    // --- 2. Conversion and Session Setup ---
    println!("\nStarting conversation for '{}'...", form.title);
    let setup_start = Instant::now();

    let backend = Arc::new(InMemoryBackend::new(form.clone(), document.clone()));
    let mut session = if cli.dry_run {
        let storyboard = document
            .into_storyboard()
            .unwrap_or_else(|e| exit_with_error(&format!("Storyboard conversion failed: {}", e)));
        ConversationSession::preview(form, storyboard)
    } else {
        ConversationSession::init(backend.clone(), &form.uuid, vec![])
            .await
            .unwrap_or_else(|e| exit_with_error(&format!("Session initialization failed: {}", e)))
    };
    let setup_duration = setup_start.elapsed();

    println!(
        "Queue built: {} blocks, {} visible at start",
        session.queue().len(),
        session.visible_queue().len()
    );

    // --- 3. Walking the Queue ---
    let walk_start = Instant::now();
    let step_limit = session.queue().len() * 4 + 8;
    let mut steps = 0usize;
    let mut finished = false;

    while !finished {
        steps += 1;
        if steps > step_limit {
            println!("Step limit reached ({} steps), a goto loop is likely. Stopping.", step_limit);
            break;
        }

        let Some(block) = session.current_block() else {
            println!("Nothing visible to answer.");
            break;
        };
        print_block(&session, block);

        let advance = if cli.human {
            match answer_interactively(&mut session) {
                PromptAction::Quit => break,
                PromptAction::Stay => false,
                PromptAction::Advance => true,
            }
        } else {
            apply_scripted_answer(&mut session, &script);
            true
        };
        if !advance {
            continue;
        }

        if let Some(block) = session.current_block() {
            if let Some(decision) = kaiwa::logic::evaluate_goto(block, session.payload()) {
                if let Some(rule) = block.logics.get(decision.rule_index) {
                    println!(
                        "    goto -> {} because {}",
                        decision.target,
                        ConditionFormatter::format_condition(&rule.condition, session.payload())
                    );
                }
            }
        }

        match session.next().await {
            Ok(StepOutcome::Continue) => {}
            Ok(StepOutcome::Submitted) => {
                println!("\nSubmission complete.");
                finished = true;
            }
            Ok(StepOutcome::Redirect(url)) => {
                println!("\nSubmission complete. Redirect to: {}", url);
                finished = true;
            }
            Ok(StepOutcome::Busy) => {
                println!("Session is busy, stopping.");
                break;
            }
            Err(SubmitError::MissingContext) if cli.dry_run => {
                println!("\nDry run: end of queue reached, submission skipped.");
                finished = true;
            }
            Err(e) => exit_with_error(&format!("Submission failed: {}", e)),
        }
    }

    let walk_duration = walk_start.elapsed();

    // --- 4. Results and Summary ---
    if finished && !cli.dry_run {
        print_backend_summary(&backend, &session);
    }

    println!("\n--- Performance Summary ---");
    println!("File Loading:      {:?}", load_duration);
    println!("Session Setup:     {:?}", setup_duration);
    println!("Conversation Walk: {:?}", walk_duration);
    println!("Steps Taken:       {}", steps);
    println!();
}

/// Prints the block the session is currently standing on.
fn print_block(session: &ConversationSession, block: &Block) {
    let position = session
        .current_index()
        .map(|index| format!("{}/{}", index + 1, session.visible_queue().len()))
        .unwrap_or_else(|| "?".to_string());
    println!("\n[{}] {} ({:?})", position, block.label(), block.kind);
    for interaction in &block.interactions {
        if interaction.label.is_empty() {
            println!("    - {}", interaction.id);
        } else {
            println!("    - {}: {}", interaction.id, interaction.label);
        }
    }
}

/// Applies the scripted answer for the current block, if the script has one.
fn apply_scripted_answer(session: &mut ConversationSession, script: &AnswerScript) {
    let Some(block_id) = session.current_block().map(|block| block.id.clone()) else {
        return;
    };
    match script.for_block(&block_id) {
        Some(ScriptedAnswer::Value {
            interaction, value, ..
        }) => {
            println!("    answer: {}", value);
            session.record_answer(interaction, value.clone());
        }
        Some(ScriptedAnswer::Multi { interactions, .. }) => {
            for choice in interactions {
                println!("    toggle: {} = {}", choice.interaction, choice.value);
                session.record_multi_answer(&choice.interaction, choice.value.clone(), None);
            }
        }
        Some(ScriptedAnswer::Files {
            interaction, files, ..
        }) => {
            let attachments: Vec<FileAttachment> =
                files.iter().map(ScriptedFile::to_attachment).collect();
            println!("    files: {}", files.len());
            session.attach_files(interaction, attachments);
        }
        Some(ScriptedAnswer::Skip { .. }) | None => {
            println!("    (skipped)");
        }
    }
}

/// What the prompt loop should do after one round of input.
enum PromptAction {
    /// Answer recorded (or skipped), move on with `next`.
    Advance,
    /// Navigation command handled, re-prompt without advancing.
    Stay,
    Quit,
}

/// Prompts for an answer to the current block.
fn answer_interactively(session: &mut ConversationSession) -> PromptAction {
    let Some(block) = session.current_block() else {
        return PromptAction::Quit;
    };
    let kind = block.kind;
    let first_interaction = block
        .interactions
        .first()
        .map(|interaction| interaction.id.clone());

    let line = prompt_for_input(
        "Answer (empty to skip, :back, :goto N, :quit)",
        None,
    );
    match line.as_str() {
        "" => PromptAction::Advance,
        ":quit" => PromptAction::Quit,
        ":back" => {
            session.back();
            PromptAction::Stay
        }
        command if command.starts_with(":goto ") => {
            match command[6..].trim().parse::<usize>() {
                Ok(index) => session.go_to_index(index),
                Err(_) => println!("Not a number: {}", &command[6..]),
            }
            PromptAction::Stay
        }
        text => {
            let Some(interaction) = first_interaction else {
                println!("This block takes no answer.");
                return PromptAction::Advance;
            };
            if kind == BlockKind::File {
                session.attach_files(
                    &interaction,
                    vec![FileAttachment::from_bytes(
                        text.trim(),
                        bytes::Bytes::from(vec![0u8; 1024]),
                    )],
                );
            } else if kind.is_multi() {
                for part in text.split(',') {
                    session.record_multi_answer(part.trim(), parse_value(part.trim()), None);
                }
            } else {
                session.record_answer(&interaction, parse_value(text));
            }
            PromptAction::Advance
        }
    }
}

/// Numbers and booleans are recorded typed, everything else as a string.
fn parse_value(text: &str) -> serde_json::Value {
    if let Ok(number) = text.parse::<i64>() {
        return serde_json::Value::from(number);
    }
    if let Ok(number) = text.parse::<f64>() {
        return serde_json::Value::from(number);
    }
    match text {
        "true" => serde_json::Value::Bool(true),
        "false" => serde_json::Value::Bool(false),
        other => serde_json::Value::String(other.to_string()),
    }
}

/// Prints what the in-memory backend recorded for the finished session.
fn print_backend_summary(backend: &InMemoryBackend, session: &ConversationSession) {
    println!("\n--- Backend Summary ---");
    let submissions = backend.submissions();
    println!("Submission steps: {}", submissions.len());
    for (index, submission) in submissions.iter().enumerate() {
        println!(
            "  {}: {} answers (expect_more_files: {})",
            index + 1,
            submission.payload.answers.len(),
            submission.expect_more_files
        );
    }
    let uploads = backend.uploads();
    if !uploads.is_empty() {
        println!("Uploaded files: {}", uploads.len());
        for upload in &uploads {
            println!("  {} -> {} ({} bytes)", upload.key, upload.file_name, upload.size_bytes);
        }
        let (loaded, total) = session.overall_upload_progress();
        println!("Progress bookkeeping: {}/{} bytes", loaded, total);
    }
}

/// A helper function to prompt the user and read a line of input.
fn prompt_for_input(prompt_text: &str, default: Option<&str>) -> String {
    let mut line = String::new();
    let default_prompt = default.map_or("".to_string(), |d| format!(" [default: {}]", d));

    print!("> {}{}: ", prompt_text, default_prompt);
    io::stdout().flush().unwrap();

    io::stdin()
        .read_line(&mut line)
        .expect("Failed to read line");
    let trimmed = line.trim().to_string();

    if trimmed.is_empty() {
        default.unwrap_or("").to_string()
    } else {
        trimmed
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
