//! CLI channel: runs one conversation over stdin/stdout.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines};

use crate::error::ChannelError;
use crate::flow::reveal::Conversation;
use crate::flow::responses::{FormValues, ResponseValue};
use crate::flow::state::{FlowSnapshot, StepView};
use crate::flow::step::{InputKind, StepKind};
use crate::flow::validate::ValidationResult;

const HELP: &str = "Commands: /restart to start over, /quit to exit.";

enum Input {
    Line(String),
    Restart,
    Quit,
}

/// Drives a [`Conversation`] from a line-oriented terminal.
pub struct CliRunner {
    conversation: Conversation,
}

impl CliRunner {
    pub fn new(conversation: Conversation) -> Self {
        Self { conversation }
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Run on the process's stdin/stdout until `/quit` or EOF.
    pub async fn run(&self) -> Result<(), ChannelError> {
        let reader = BufReader::new(tokio::io::stdin());
        let writer = tokio::io::stdout();
        self.run_with(reader, writer).await
    }

    /// Run against any line reader and writer.
    pub async fn run_with<R, W>(&self, reader: R, mut out: W) -> Result<(), ChannelError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();
        write(&mut out, &format!("{HELP}\n\n")).await?;
        self.conversation.start().await;

        loop {
            let snapshot = self.show_next(&mut out).await?;
            let step = &snapshot.step;

            let proceed = match step.kind {
                StepKind::Form => self.fill_form(step, &mut lines, &mut out).await?,
                StepKind::TerminalSuccess | StepKind::TerminalFailure => {
                    write(&mut out, "\nType /restart to begin again or /quit to exit.\n").await?;
                    self.wait_for_command(&mut lines, &mut out).await?
                }
                StepKind::MultiChoice => self.pick_many(step, &mut lines, &mut out).await?,
                _ => self.pick_one(step, &mut lines, &mut out).await?,
            };
            if !proceed {
                return Ok(());
            }
        }
    }

    /// Show "typing..." until the current step is revealed, then render it.
    async fn show_next<W: AsyncWrite + Unpin>(
        &self,
        out: &mut W,
    ) -> Result<FlowSnapshot, ChannelError> {
        if self.conversation.snapshot().await.awaiting_display {
            write(out, "typing...\n").await?;
        }
        let snapshot = self.conversation.wait_revealed().await;
        write(out, &render_step(&snapshot)).await?;
        Ok(snapshot)
    }

    async fn pick_one<R, W>(
        &self,
        step: &StepView,
        lines: &mut Lines<R>,
        out: &mut W,
    ) -> Result<bool, ChannelError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            let line = match read_input(lines, out).await? {
                Input::Quit => return Ok(false),
                Input::Restart => {
                    self.conversation.restart().await;
                    return Ok(true);
                }
                Input::Line(line) => line,
            };
            let Some(value) = parse_choice(step, &line) else {
                write(out, "Please pick one of the numbered options.\n").await?;
                continue;
            };
            match self.conversation.choose(&value).await {
                Ok(_) => return Ok(true),
                Err(e) => write(out, &format!("{e}\n")).await?,
            }
        }
    }

    async fn pick_many<R, W>(
        &self,
        step: &StepView,
        lines: &mut Lines<R>,
        out: &mut W,
    ) -> Result<bool, ChannelError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        write(out, "Select all that apply, separated by commas.\n").await?;
        loop {
            let line = match read_input(lines, out).await? {
                Input::Quit => return Ok(false),
                Input::Restart => {
                    self.conversation.restart().await;
                    return Ok(true);
                }
                Input::Line(line) => line,
            };
            let Some(values) = parse_selection(step, &line) else {
                write(out, "Please pick at least one of the numbered options.\n").await?;
                continue;
            };
            match self.conversation.choose_many(&values).await {
                Ok(_) => return Ok(true),
                Err(e) => write(out, &format!("{e}\n")).await?,
            }
        }
    }

    /// Prompt field by field, then submit. An invalid submission is
    /// reported and only the offending field is asked again.
    async fn fill_form<R, W>(
        &self,
        step: &StepView,
        lines: &mut Lines<R>,
        out: &mut W,
    ) -> Result<bool, ChannelError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut values = FormValues::new();
        let mut pending: Vec<_> = step.fields.iter().collect();

        loop {
            for field in pending.drain(..) {
                let suffix = match field.input {
                    InputKind::Checkbox => " [y/n]",
                    _ => "",
                };
                write(out, &format!("{}{suffix}:\n", field.label)).await?;
                let line = match read_input(lines, out).await? {
                    Input::Quit => return Ok(false),
                    Input::Restart => {
                        self.conversation.restart().await;
                        return Ok(true);
                    }
                    Input::Line(line) => line,
                };
                let value = match field.input {
                    InputKind::Checkbox => ResponseValue::Flag(is_yes(&line)),
                    _ => ResponseValue::Text(line),
                };
                values.insert(field.name.clone(), value);
            }

            match self.conversation.submit_form(values.clone()).await {
                Ok(ValidationResult::Valid) => return Ok(true),
                Ok(ValidationResult::Invalid(issue)) => {
                    write(out, &format!("{}\n", issue.message())).await?;
                    pending.extend(step.fields.iter().filter(|f| f.name == issue.field));
                }
                Err(e) => {
                    write(out, &format!("{e}\n")).await?;
                    return Ok(true);
                }
            }
        }
    }

    async fn wait_for_command<R, W>(
        &self,
        lines: &mut Lines<R>,
        out: &mut W,
    ) -> Result<bool, ChannelError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            match read_input(lines, out).await? {
                Input::Quit => return Ok(false),
                Input::Restart => {
                    self.conversation.restart().await;
                    return Ok(true);
                }
                Input::Line(_) => write(out, &format!("{HELP}\n")).await?,
            }
        }
    }
}

fn disconnected(e: std::io::Error) -> ChannelError {
    ChannelError::Disconnected {
        name: "cli".to_string(),
        reason: e.to_string(),
    }
}

async fn write<W: AsyncWrite + Unpin>(out: &mut W, text: &str) -> Result<(), ChannelError> {
    out.write_all(text.as_bytes()).await.map_err(disconnected)?;
    out.flush().await.map_err(disconnected)
}

async fn read_input<R, W>(lines: &mut Lines<R>, out: &mut W) -> Result<Input, ChannelError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    loop {
        write(out, "> ").await?;
        let Some(line) = lines.next_line().await.map_err(disconnected)? else {
            return Ok(Input::Quit);
        };
        let line = line.trim();
        match line {
            "" => continue,
            "/quit" => return Ok(Input::Quit),
            "/restart" => return Ok(Input::Restart),
            _ => return Ok(Input::Line(line.to_string())),
        }
    }
}

fn is_yes(input: &str) -> bool {
    matches!(
        input.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "true" | "1"
    )
}

/// Prompt text plus numbered options for the revealed step.
pub fn render_step(snapshot: &FlowSnapshot) -> String {
    let step = &snapshot.step;
    let mut text = String::from("\n");
    if let Some(progress) = snapshot.progress {
        text.push_str(&format!("[Step {} of {}]\n", progress.current, progress.total));
    }
    text.push_str(&step.prompt);
    text.push('\n');
    for (i, option) in step.options.iter().enumerate() {
        text.push_str(&format!("  {}. {}\n", i + 1, option.label));
    }
    text
}

/// Map a typed line to an option value: a 1-based number, the value itself,
/// or the label (case-insensitive).
pub fn parse_choice(step: &StepView, input: &str) -> Option<String> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return n
            .checked_sub(1)
            .and_then(|i| step.options.get(i))
            .map(|o| o.value.clone());
    }
    step.options
        .iter()
        .find(|o| o.value == input || o.label.eq_ignore_ascii_case(input))
        .map(|o| o.value.clone())
}

/// Comma-separated [`parse_choice`]. `None` if any entry is unrecognised or
/// nothing was picked.
pub fn parse_selection(step: &StepView, input: &str) -> Option<Vec<String>> {
    let values: Option<Vec<String>> = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| parse_choice(step, s))
        .collect();
    values.filter(|v| !v.is_empty())
}
