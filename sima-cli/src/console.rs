// Tarih-i Sima interactive console
// Chat with a historical figure from the terminal

use anyhow::Result;
use sima_chat::{Route, SessionController, SessionError};
use sima_me::AvatarAnimation;
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};

/// A console line, parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Say(String),
    Personas,
    Persona(String),
    Prompts,
    Events,
    Event(Option<String>),
    Status,
    History,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }
        let Some(rest) = line.strip_prefix('/') else {
            return Some(Command::Say(line.to_string()));
        };

        let mut parts = rest.splitn(2, char::is_whitespace);
        let name = parts.next().unwrap_or_default().to_lowercase();
        let arg = parts.next().map(str::trim).filter(|a| !a.is_empty()).map(str::to_string);

        Some(match (name.as_str(), arg) {
            ("personas" | "figures", _) => Command::Personas,
            ("persona" | "p", Some(id)) => Command::Persona(id),
            ("prompts", _) => Command::Prompts,
            ("events", _) => Command::Events,
            ("event", arg) => Command::Event(arg),
            ("status", _) => Command::Status,
            ("history", _) => Command::History,
            ("help" | "?", _) => Command::Help,
            ("quit" | "exit" | "q", _) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        })
    }
}

pub enum CommandResult {
    Continue,
    Exit,
    Output(String),
    Error(String),
}

pub struct InteractiveConsole {
    session: SessionController,
}

impl InteractiveConsole {
    pub fn new(session: SessionController) -> Self {
        Self { session }
    }

    /// Start the interactive console
    pub async fn run(&mut self) -> Result<()> {
        self.print_banner();
        self.print_help();

        let mut lines = BufReader::new(io::stdin()).lines();
        let mut stdout = io::stdout();

        loop {
            stdout.write_all(self.prompt().as_bytes()).await?;
            stdout.flush().await?;

            // The figure listens while the user types
            self.session.set_listening(true);
            let line = lines.next_line().await?;
            self.session.set_listening(false);

            let Some(line) = line else { break };
            let Some(command) = Command::parse(&line) else { continue };

            match self.handle_command(command).await {
                CommandResult::Continue => continue,
                CommandResult::Exit => break,
                CommandResult::Output(output) => println!("{}", output),
                CommandResult::Error(msg) => println!("❌ {}", msg),
            }
        }

        println!("\n👋 Güle güle!");
        Ok(())
    }

    fn print_banner(&self) {
        println!("\n╔═══════════════════════════════════════════════════╗");
        println!("║                  Tarih-i Sima                     ║");
        println!("║        Tarihi figürlerle sohbet edin              ║");
        println!("╚═══════════════════════════════════════════════════╝");
        println!();
    }

    fn print_help(&self) {
        println!("📚 Komutlar:");
        println!("  /personas         - Figürleri listele");
        println!("  /persona <id>     - Figür seç");
        println!("  /prompts          - Örnek sorular");
        println!("  /events           - Tarihi olaylar");
        println!("  /event [id]       - Olay seç (id olmadan temizle)");
        println!("  /status           - Bağlantı ve avatar durumu");
        println!("  /history          - Sohbet geçmişi");
        println!("  /quit             - Çıkış");
        println!("Diğer her satır seçili figüre mesaj olarak gönderilir.");
        println!();
    }

    fn prompt(&self) -> String {
        match self.session.persona() {
            Some(persona) => format!("sima[{}]> ", persona.id),
            None => "sima> ".to_string(),
        }
    }

    pub async fn handle_command(&mut self, command: Command) -> CommandResult {
        match command {
            Command::Say(text) => self.say(&text).await,
            Command::Personas => CommandResult::Output(self.personas()),
            Command::Persona(id) => match self.session.select_persona(&id) {
                Ok(persona) => CommandResult::Output(format!("🎭 {} ({}, {})", persona.name, persona.era, persona.location)),
                Err(e) => CommandResult::Error(e.to_string()),
            },
            Command::Prompts => match self.session.persona() {
                Some(persona) => {
                    let prompts = self.session.catalog().example_prompts(persona.id.as_str());
                    CommandResult::Output(numbered(&prompts))
                }
                None => CommandResult::Error(SessionError::NoPersona.to_string()),
            },
            Command::Events => match self.session.persona() {
                Some(persona) => {
                    let lines: Vec<String> = persona
                        .events
                        .iter()
                        .map(|e| match &e.location {
                            Some(location) => format!("  {:<24} {} - {} ({})", e.id, e.date, e.title, location),
                            None => format!("  {:<24} {} - {}", e.id, e.date, e.title),
                        })
                        .collect();
                    CommandResult::Output(lines.join("\n"))
                }
                None => CommandResult::Error(SessionError::NoPersona.to_string()),
            },
            Command::Event(Some(id)) => match self.session.select_event(&id) {
                Ok(event) => CommandResult::Output(format!("📜 {} ({}): {}", event.title, event.date, event.significance)),
                Err(e) => CommandResult::Error(e.to_string()),
            },
            Command::Event(None) => {
                self.session.clear_event();
                CommandResult::Continue
            }
            Command::Status => CommandResult::Output(self.status()),
            Command::History => CommandResult::Output(self.history()),
            Command::Help => {
                self.print_help();
                CommandResult::Continue
            }
            Command::Quit => CommandResult::Exit,
            Command::Unknown(line) => CommandResult::Error(format!("Bilinmeyen komut: {} (/help)", line)),
        }
    }

    async fn say(&self, text: &str) -> CommandResult {
        match self.session.send_message(text).await {
            Ok(message) => CommandResult::Output(format!("{}: {}", message.speaker(), message.text)),
            Err(SessionError::Superseded) => CommandResult::Continue,
            Err(e) => {
                // The session already recorded an apology line for delivery failures
                let shown = self
                    .session
                    .messages()
                    .last()
                    .filter(|m| !m.is_user)
                    .map(|m| format!("{}: {}", m.speaker(), m.text));
                match shown {
                    Some(line) => {
                        tracing::debug!("Send failed: {}", e);
                        CommandResult::Output(line)
                    }
                    None => CommandResult::Error(e.to_string()),
                }
            }
        }
    }

    fn personas(&self) -> String {
        let selected = self.session.persona().map(|p| p.id);
        self.session
            .catalog()
            .iter()
            .map(|p| {
                let marker = if Some(&p.id) == selected.as_ref() { "*" } else { " " };
                format!("{} {:<22} {} - {}", marker, p.id, p.name, p.title)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn status(&self) -> String {
        let transport = self.session.transport_status();
        let socket = match transport.socket_connected {
            None => "kapalı",
            Some(true) => "bağlı",
            Some(false) => "bağlantı koptu",
        };
        let route = |r: Route| match r {
            Route::Socket => "socket",
            Route::Http => "http",
        };
        let avatar = self.session.avatar_state();
        let animation = match avatar.current_animation {
            AvatarAnimation::Entrance => "giriş",
            AvatarAnimation::Idle => "bekliyor",
            AvatarAnimation::Speaking => "konuşuyor",
            AvatarAnimation::Listening => "dinliyor",
            AvatarAnimation::Thinking => "düşünüyor",
        };
        let speech = match self.session.speech() {
            Some(queue) if queue.is_speaking() => "konuşuyor",
            Some(_) => "hazır",
            None => "kapalı",
        };

        let mut lines = vec![
            format!("Socket:   {}", socket),
            format!("Rota:     {}", route(transport.preferred)),
            format!("Avatar:   {}", animation),
            format!("Ses:      {}", speech),
        ];
        if let Some(last) = transport.last_route {
            lines.insert(2, format!("Son yanıt: {}", route(last)));
        }
        if let Some(event) = self.session.selected_event() {
            lines.push(format!("Olay:     {} ({})", event.title, event.date));
        }
        lines.join("\n")
    }

    fn history(&self) -> String {
        let messages = self.session.messages();
        if messages.is_empty() {
            return "(boş)".to_string();
        }
        messages
            .iter()
            .map(|m| format!("[{}] {}: {}", m.timestamp.format("%H:%M:%S"), m.speaker(), m.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn numbered(items: &[String]) -> String {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("  {}. {}", i + 1, item))
        .collect::<Vec<_>>()
        .join("\n")
}
