//! CLI (Command Line Interface) mode
//!
//! Interactive REPL running `/pagerduty` commands from the terminal, plus a
//! one-shot execute mode.

use nu_ansi_term::{Color, Style};
use pd_command::{CommandArgs, CommandHandler, SUBCOMMANDS, TRIGGER};
use reedline::{
    ColumnarMenu, Completer, DefaultHinter, Emacs, KeyCode, KeyModifiers, Keybindings,
    MenuBuilder, Prompt, Reedline, ReedlineEvent, ReedlineMenu, Signal, Suggestion,
};
use tracing::info;

/// Commands handled by the REPL itself
const BUILTINS: &[(&str, &str)] = &[("/exit", "Exit the program"), ("/quit", "Exit the program")];

/// Completes `/pagerduty` subcommands and REPL built-ins
#[derive(Clone)]
pub struct CommandCompleter {
    candidates: Vec<(String, String)>,
}

impl CommandCompleter {
    pub fn new() -> Self {
        let mut candidates: Vec<(String, String)> = SUBCOMMANDS
            .iter()
            .map(|(name, hint, description)| {
                let value = format!("/{} {}", TRIGGER, name);
                let description = if hint.is_empty() {
                    description.to_string()
                } else {
                    format!("{} {}", hint, description)
                };
                (value, description)
            })
            .collect();
        candidates.extend(
            BUILTINS
                .iter()
                .map(|(cmd, desc)| (cmd.to_string(), desc.to_string())),
        );
        Self { candidates }
    }
}

impl Default for CommandCompleter {
    fn default() -> Self {
        Self::new()
    }
}

impl Completer for CommandCompleter {
    fn complete(&mut self, line: &str, pos: usize) -> Vec<Suggestion> {
        let typed = &line[..pos.min(line.len())];
        if !typed.starts_with('/') {
            return Vec::new();
        }

        self.candidates
            .iter()
            .filter(|(cmd, _)| cmd.starts_with(typed))
            .map(|(cmd, desc)| Suggestion {
                value: cmd.clone(),
                description: Some(desc.clone()),
                extra: None,
                span: reedline::Span::new(0, pos),
                append_whitespace: true,
                style: None,
            })
            .collect()
    }
}

/// Prompt with colored styling
struct ColoredPrompt {
    style: Style,
}

impl ColoredPrompt {
    fn new() -> Self {
        Self {
            style: Color::Green.bold(),
        }
    }
}

impl Prompt for ColoredPrompt {
    fn render_prompt_left(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Owned(self.style.paint("pd> ").to_string())
    }

    fn render_prompt_right(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _prompt_mode: reedline::PromptEditMode) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_multiline_indicator(&self) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }

    fn render_prompt_history_search_indicator(
        &self,
        _history_search: reedline::PromptHistorySearch,
    ) -> std::borrow::Cow<'_, str> {
        std::borrow::Cow::Borrowed("")
    }
}

/// What a line typed at the prompt asks for
#[derive(Debug, PartialEq, Eq)]
enum Input {
    Empty,
    Exit,
    Command(String),
}

/// `oncall` and `/pagerduty oncall` both run the subcommand.
fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }

    match line.to_lowercase().as_str() {
        "/exit" | "/quit" | "/q" | "exit" | "quit" => return Input::Exit,
        _ => {}
    }

    let prefix = format!("/{}", TRIGGER);
    if line == prefix || line.starts_with(&format!("{} ", prefix)) {
        Input::Command(line.to_string())
    } else {
        Input::Command(format!("{} {}", prefix, line.trim_start_matches('/')))
    }
}

/// Run CLI interactive mode
pub async fn run_cli(handler: CommandHandler) -> anyhow::Result<()> {
    info!("Starting CLI mode");
    print_welcome();

    let mut keybindings = default_keybindings();
    // Trigger completion on '/'
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Char('/'),
        ReedlineEvent::Edit(vec![
            reedline::EditCommand::InsertChar('/'),
            reedline::EditCommand::Complete,
        ]),
    );

    let menu = Box::new(
        ColumnarMenu::default()
            .with_name("command_menu")
            .with_columns(1)
            .with_column_width(Some(60))
            .with_only_buffer_difference(false),
    );

    let hinter = DefaultHinter::default().with_style(Style::new().dimmed());

    let mut line_editor = Reedline::create()
        .with_completer(Box::new(CommandCompleter::new()))
        .with_menu(ReedlineMenu::EngineCompleter(menu))
        .with_hinter(Box::new(hinter))
        .with_edit_mode(Box::new(Emacs::new(keybindings)));

    let prompt = ColoredPrompt::new();

    loop {
        match line_editor.read_line(&prompt) {
            Ok(Signal::Success(line)) => match parse_input(&line) {
                Input::Empty => continue,
                Input::Exit => {
                    println!("\nBye!\n");
                    break;
                }
                Input::Command(command) => {
                    let response = handler.handle(&CommandArgs::new(command)).await;
                    println!("\n{}\n", response.text);
                }
            },
            Ok(Signal::CtrlC) => {
                println!("^C");
                continue;
            }
            Ok(Signal::CtrlD) => {
                println!("\nBye!\n");
                break;
            }
            Err(err) => {
                eprintln!("\nError: {}\n", err);
                break;
            }
        }
    }

    Ok(())
}

/// Run one command and print the reply
pub async fn run_execute(handler: &CommandHandler, line: &str) -> anyhow::Result<()> {
    let Input::Command(command) = parse_input(line) else {
        anyhow::bail!("No command given. Try `pd-gateway --execute help`.");
    };

    info!("Executing: {}", command);
    let response = handler.handle(&CommandArgs::new(command)).await;
    println!("{}", response.text);
    Ok(())
}

fn default_keybindings() -> Keybindings {
    let mut keybindings = Keybindings::new();
    keybindings.add_binding(
        KeyModifiers::NONE,
        KeyCode::Tab,
        ReedlineEvent::Edit(vec![reedline::EditCommand::Complete]),
    );
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Enter, ReedlineEvent::Submit);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Esc, ReedlineEvent::Esc);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('c'), ReedlineEvent::CtrlC);
    keybindings.add_binding(KeyModifiers::CONTROL, KeyCode::Char('d'), ReedlineEvent::CtrlD);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Up, ReedlineEvent::Up);
    keybindings.add_binding(KeyModifiers::NONE, KeyCode::Down, ReedlineEvent::Down);
    keybindings
}

fn print_welcome() {
    println!();
    println!("pd-gateway CLI - PagerDuty on-call and paging");
    println!("{}", "─".repeat(50));
    println!("Type a subcommand (oncall, schedules, schedule <id>, ...)");
    println!("or a full /{} command. /exit to quit.", TRIGGER);
    println!("Press / or Tab for completions.");
    println!();
}
