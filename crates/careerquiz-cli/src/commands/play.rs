//! The `careerquiz play` command: an interactive quiz driven by stdin.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use tokio::io::{AsyncBufReadExt, BufReader};

use careerquiz_core::engine::{AttemptView, OptionState};
use careerquiz_core::model::Difficulty;
use careerquiz_core::parser;
use careerquiz_core::results::QuizResult;
use careerquiz_core::session::{Command, QuizSession, SessionConfig, SessionEvent};
use careerquiz_core::source::{ShuffledSource, StaticSource};
use careerquiz_core::traits::QuestionSource;
use careerquiz_providers::{
    load_config_from, resolve_provider, CareerQuizConfig, GeneratedSource, GenerationParams,
};

const DEFAULT_GENERATED_COUNT: usize = 5;

pub struct PlayOptions {
    pub bank: Option<PathBuf>,
    pub generate: Option<String>,
    pub count: Option<usize>,
    pub no_timer: bool,
    pub time_limit: Option<u32>,
    pub shuffle: bool,
    pub export: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub config: Option<PathBuf>,
}

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Command(Command),
    Help,
    Quit,
    Invalid(String),
}

fn parse_input(line: &str) -> Option<Input> {
    let line = line.trim().to_lowercase();
    let input = match line.as_str() {
        "" => return None,
        "s" | "submit" => Input::Command(Command::Submit),
        "n" | "next" => Input::Command(Command::Advance),
        "r" | "retake" => Input::Command(Command::Regenerate),
        "?" | "show" => Input::Command(Command::Refresh),
        "h" | "help" => Input::Help,
        "q" | "quit" => Input::Quit,
        other => match other.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Command(Command::Select(n - 1)),
            _ => Input::Invalid(other.to_string()),
        },
    };
    Some(input)
}

/// Events that are the direct reply to a command.
fn answers_command(event: &SessionEvent) -> bool {
    !matches!(
        event,
        SessionEvent::Started(_) | SessionEvent::Tick { .. } | SessionEvent::TimedOut(_)
    )
}

pub async fn execute(opts: PlayOptions) -> Result<()> {
    let config = load_config_from(opts.config.as_deref())?;
    anyhow::ensure!(opts.count != Some(0), "--count must be at least 1");
    let source = build_source(&opts, &config)?;

    let mut engine = config.quiz.engine_config();
    if opts.no_timer {
        engine.timer_enabled = false;
    }
    if let Some(limit) = opts.time_limit {
        anyhow::ensure!(limit >= 1, "--time-limit must be at least 1");
        engine.time_limit = limit;
    }

    let mut handle = QuizSession::start(
        source,
        SessionConfig {
            engine,
            tick_period: Duration::from_secs(1),
        },
    )
    .await?;
    tracing::debug!(session = %handle.id(), "quiz session ready");
    let time_limit = engine.timer_enabled.then_some(engine.time_limit);
    print_help(time_limit);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;
    let mut pending = 0usize;
    let mut last_result: Option<QuizResult> = None;

    loop {
        tokio::select! {
            event = handle.next_event() => {
                let Some(event) = event else { break };
                if answers_command(&event) {
                    pending = pending.saturating_sub(1);
                }
                match event {
                    SessionEvent::Started(view) | SessionEvent::Updated(view) => render(&view),
                    SessionEvent::Regenerated(view) => {
                        println!("\nNew attempt #{}", view.attempt_id);
                        render(&view);
                    }
                    SessionEvent::Tick { remaining, .. } => {
                        if remaining <= 5 || remaining % 10 == 0 {
                            eprintln!("  {remaining}s left");
                        }
                    }
                    SessionEvent::TimedOut(view) => {
                        println!("\nTime's up!");
                        render(&view);
                    }
                    SessionEvent::Finished(result) => {
                        print_result(&result);
                        println!("Enter r to retake with new questions, q to quit.");
                        last_result = Some(result);
                    }
                    SessionEvent::Rejected(e) => eprintln!("  {e}"),
                    SessionEvent::RegenerateFailed(msg) => {
                        eprintln!("  could not start a new attempt: {msg}");
                    }
                }
                if !stdin_open && pending == 0 {
                    break;
                }
            }
            line = lines.next_line(), if stdin_open => {
                match line.context("failed to read input")? {
                    None => {
                        stdin_open = false;
                        if pending == 0 {
                            break;
                        }
                    }
                    Some(line) => match parse_input(&line) {
                        None => {}
                        Some(Input::Command(command)) => {
                            handle.send(command).await?;
                            pending += 1;
                        }
                        Some(Input::Help) => print_help(time_limit),
                        Some(Input::Quit) => {
                            stdin_open = false;
                            if pending == 0 {
                                break;
                            }
                        }
                        Some(Input::Invalid(text)) => {
                            eprintln!("  unrecognised input {text:?}; enter h for help");
                        }
                    },
                }
            }
        }
    }

    handle.shutdown().await?;

    match last_result {
        Some(result) => {
            if let Some(path) = &opts.export {
                result.save_json(path)?;
                println!("Result saved to: {}", path.display());
            }
        }
        None => println!("Quiz ended before the last question."),
    }
    Ok(())
}

fn build_source(opts: &PlayOptions, config: &CareerQuizConfig) -> Result<Arc<dyn QuestionSource>> {
    if let Some(topic) = &opts.generate {
        let provider = resolve_provider(config, opts.provider.as_deref())?;
        let params = GenerationParams {
            bank_id: slug(topic),
            title: format!("{topic} Skill Test"),
            topic: topic.clone(),
            difficulty: Difficulty::default(),
            question_count: opts.count.unwrap_or(DEFAULT_GENERATED_COUNT),
            model: opts
                .model
                .clone()
                .unwrap_or_else(|| config.default_model.clone()),
        };
        return Ok(Arc::new(GeneratedSource::new(Arc::from(provider), params)));
    }

    let path = opts
        .bank
        .as_ref()
        .context("either --bank or --generate is required")?;
    let bank = parser::parse_bank(path)?;
    for w in parser::validate_bank(&bank) {
        tracing::debug!(question = ?w.question_id, "{}", w.message);
    }

    let shuffle = opts.shuffle || config.quiz.shuffle;
    match opts.count {
        Some(n) => {
            tracing::debug!(bank = %bank.id, sample = n, "sampling questions per attempt");
            Ok(Arc::new(
                ShuffledSource::new(bank, rand::random())
                    .sample(n)
                    .shuffle_options(shuffle),
            ))
        }
        None if shuffle => Ok(Arc::new(
            ShuffledSource::new(bank, rand::random()).shuffle_options(true),
        )),
        None => Ok(Arc::new(StaticSource::new(bank))),
    }
}

fn slug(topic: &str) -> String {
    let slug: String = topic
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect();
    slug.split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

fn print_help(time_limit: Option<u32>) {
    println!("Enter an option number to select it, s to submit, n for the next question,");
    println!("r to retake with new questions, ? to show the question again, q to quit.");
    if let Some(limit) = time_limit {
        println!("You have {limit}s per question.");
    }
}

fn render(view: &AttemptView) {
    println!(
        "\n{} | question {}/{} | score {}",
        view.bank_title, view.question_number, view.total, view.score
    );
    if let (Some(remaining), false) = (view.time_remaining, view.answered) {
        println!("Time left: {remaining}s");
    }
    println!("{}", view.prompt);

    for (i, option) in view.options.iter().enumerate() {
        let marker = match option.state {
            OptionState::Idle => ' ',
            OptionState::Selected => '>',
            OptionState::Correct => '+',
            OptionState::Incorrect => 'x',
        };
        println!("  {marker} {}. {}", i + 1, option.label);
    }

    if view.answered {
        match view.last_correct {
            Some(true) => println!("Correct!"),
            _ => println!("Incorrect."),
        }
        if let Some(explanation) = view.explanation.as_deref().filter(|e| !e.is_empty()) {
            println!("{explanation}");
        }
        if view.is_last_question() {
            println!("Enter n to see your result.");
        } else {
            println!("Enter n for the next question.");
        }
    }
}

fn print_result(result: &QuizResult) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Result"]);

    for (i, answer) in result.answers.iter().enumerate() {
        let selected = answer
            .selected
            .map(|s| (s + 1).to_string())
            .unwrap_or_else(|| "-".to_string());
        let outcome = if answer.correct {
            "correct"
        } else if answer.timed_out {
            "timed out"
        } else {
            "wrong"
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&answer.question_id),
            Cell::new(selected),
            Cell::new(outcome),
        ]);
    }

    println!("\n{}: attempt #{} complete", result.bank_title, result.attempt_id);
    println!("{table}");
    println!(
        "Score: {}/{} ({}%), {}",
        result.score,
        result.total,
        result.percentage,
        result.grade()
    );
}
