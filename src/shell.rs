use crate::error::Error;
use crate::options::{Options, AUTO_MOVE, AUTO_MOVE_DELAY, SHOW_MARKS};
use crate::piece::Piece;
use crate::r#move::Move;
use crate::session::{Mode, Session};
use crate::square::{parse_square, square_name, Square};
use crate::timer::AutoMoveTimer;
use crate::tree::Path;

use lazy_static::lazy_static;
use regex::Regex;
use rustyline::config::Configurer;
use rustyline::Editor;
use std::fmt::Write;
use std::time::Duration;
use tracing::warn;

lazy_static! {
    static ref ARGS_RE: Regex = Regex::new(r#"(".*?"|[^"\s]+)"#).expect("argument pattern compiles");
}

// Slack given to the timer thread on top of the configured delay
const REPLY_GRACE: Duration = Duration::from_millis(500);

/// Line-oriented front end of a session
pub struct Shell {
    session: Session,
    timer: AutoMoveTimer,
    options: Options,
}

enum OkCode {
    Done,
    Output(String),
    ShouldQuit,
}

enum ErrCode {
    NoCommand,
    BadCommand(String),
    MissingArg(String),
    Failed(Error),
}

impl From<Error> for ErrCode {
    fn from(e: Error) -> Self {
        ErrCode::Failed(e)
    }
}

impl Shell {
    pub fn new(session: Session, options: Options) -> Shell {
        let mut shell = Shell {
            session,
            timer: AutoMoveTimer::new(),
            options,
        };
        shell.sync_options();
        shell
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn run(&mut self) {
        let mut editor = Editor::<()>::new();
        editor.set_auto_add_history(true);
        editor.set_check_cursor_position(true);
        while let Ok(line) = editor.readline(&format!("{}> ", self.session.mode())) {
            match self.handle_command(&line) {
                Ok(OkCode::ShouldQuit) => break,
                Ok(OkCode::Output(text)) => println!("{}", text),
                Ok(OkCode::Done) | Err(ErrCode::NoCommand) => (),
                Err(ErrCode::BadCommand(cmd)) => eprintln!("Unknown or badly formed command: {}", cmd),
                Err(ErrCode::MissingArg(arg)) => {
                    eprintln!("Missing an argument: {} {} <- here", line.trim(), arg)
                }
                Err(ErrCode::Failed(e)) => eprintln!("{}", e),
            }
        }
    }

    fn sync_options(&mut self) {
        let delay = self.options.int(AUTO_MOVE_DELAY).unwrap_or(1000).max(0) as u64;
        self.session.delay = Duration::from_millis(delay);
        self.session.auto_move = self.options.flag(AUTO_MOVE);
    }

    fn handle_command(&mut self, line: &str) -> Result<OkCode, ErrCode> {
        let mut args = ARGS_RE.find_iter(line).map(|m| m.as_str());
        let Some(cmd) = args.next() else {
            return Err(ErrCode::NoCommand);
        };
        // Everything after the command word, verbatim
        let rest = line.trim_start()[cmd.len()..].trim();
        match cmd {
            "load" => {
                let document = rest.replace("\\n", "\n");
                self.session.load(Some(&document))?;
                return Ok(OkCode::Output(self.render()));
            }
            "loadfile" => {
                let path = args.next().ok_or_else(|| ErrCode::MissingArg("<path>".to_string()))?;
                let document = std::fs::read_to_string(path.trim_matches('"')).map_err(Error::from)?;
                self.session.load(Some(&document))?;
                return Ok(OkCode::Output(self.render()));
            }
            "reset" => self.session.reset()?,
            "start" => self.session.start()?,
            "clear" => self.session.clear()?,
            "put" => {
                let piece = args
                    .next()
                    .and_then(|p| p.chars().next())
                    .and_then(Piece::from_char)
                    .ok_or_else(|| ErrCode::MissingArg("<piece>".to_string()))?;
                let sq = Self::square_arg(args.next())?;
                self.session.put(sq, piece)?;
            }
            "remove" => {
                let sq = Self::square_arg(args.next())?;
                self.session.remove(sq)?;
            }
            "move" => {
                let text = args.next().ok_or_else(|| ErrCode::MissingArg("<move>".to_string()))?;
                let (origin, target, promotion) =
                    Move::parse(text).ok_or_else(|| ErrCode::BadCommand(text.to_string()))?;
                if let Some(ticket) = self.session.apply_move(origin, target, promotion)? {
                    self.timer.schedule(ticket);
                    println!("{}", self.render());
                    self.await_reply();
                }
                return Ok(OkCode::Output(self.render()));
            }
            "pass" => self.session.pass()?,
            "next" => {
                self.session.next()?;
            }
            "prev" => {
                self.session.prev()?;
            }
            "first" => self.session.first()?,
            "last" => self.session.last()?,
            "goto" => {
                let path = rest.parse::<Path>()?;
                self.session.goto(&path)?;
            }
            "show" => return Ok(OkCode::Output(self.render())),
            "status" => return Ok(OkCode::Output(self.status())),
            "export" => return Ok(OkCode::Output(self.session.export()?)),
            "tree" => return Ok(OkCode::Output(self.tree())),
            "setoption" => {
                let name = if let Some("name") = args.next() {
                    args.next().unwrap_or("")
                } else {
                    ""
                };
                let value = args.nth(1).ok_or_else(|| ErrCode::MissingArg("<value>".to_string()))?;
                if !self.options.set(name, value) {
                    return Err(ErrCode::BadCommand(format!("setoption name {}", name)));
                }
                self.sync_options();
            }
            "options" => {
                let text = self
                    .options
                    .iter()
                    .map(|o| format!("option {}", o))
                    .collect::<Vec<_>>()
                    .join("\n");
                return Ok(OkCode::Output(text));
            }
            "quit" => return Ok(OkCode::ShouldQuit),
            _ => return Err(ErrCode::BadCommand(String::from(cmd))),
        }
        Ok(OkCode::Done)
    }

    fn square_arg(arg: Option<&str>) -> Result<Square, ErrCode> {
        let text = arg.ok_or_else(|| ErrCode::MissingArg("<square>".to_string()))?;
        parse_square(text).ok_or_else(|| ErrCode::Failed(Error::InvalidSquare(text.to_string())))
    }

    // Blocks until the hidden side has answered
    fn await_reply(&mut self) {
        while self.session.mode() == Mode::Timer {
            match self.timer.wait(self.session.delay + REPLY_GRACE) {
                Some(generation) => {
                    self.session.fire(generation);
                }
                None => {
                    warn!(generation = self.session.generation(), "auto-move never arrived, replying now");
                    self.session.fire(self.session.generation());
                }
            }
        }
    }

    fn names(squares: impl IntoIterator<Item = Square>) -> String {
        squares
            .into_iter()
            .filter_map(square_name)
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn render(&self) -> String {
        if self.session.mode() == Mode::Edit {
            return format!("{}", self.session.setup());
        }
        let tracker = self.session.tracker();
        let mut text = format!("{}\nfen: {}\npath: {}", tracker, self.session.fen(), self.session.path());
        if let Some(san) = &self.session.tree().node(self.session.current()).san {
            let _ = write!(text, " ({})", san);
        }
        if self.options.flag(SHOW_MARKS) {
            let marks = tracker.marks();
            if marks.checks.non_empty() {
                let _ = write!(text, "\nchecks: {}", Self::names(marks.checks));
            }
            if !marks.arrows.is_empty() {
                let arrows = marks
                    .arrows
                    .iter()
                    .map(|(from, to)| format!("{}-{}", Self::names([*from]), Self::names([*to])))
                    .collect::<Vec<_>>()
                    .join(" ");
                let _ = write!(text, "\narrows: {}", arrows);
            }
        }
        text
    }

    fn status(&self) -> String {
        let mut text = format!("mode: {}", self.session.mode());
        if self.session.mode() == Mode::Edit {
            return text;
        }
        let tracker = self.session.tracker();
        let (outcome, witness) = tracker.outcome_with_witness();
        let _ = write!(
            text,
            "\nturn: {}\ncandidates: {}\nnew: {}\nresult: {}",
            tracker.turn().name(),
            tracker.candidates().len(),
            Self::names(tracker.delta()),
            outcome.map_or_else(|| "*".to_string(), |o| o.to_string())
        );
        if let Some(witness) = witness {
            let _ = write!(text, " ({})", Self::names([witness]));
        }
        text
    }

    fn tree(&self) -> String {
        let tree = self.session.tree();
        tree.depth_first()
            .into_iter()
            .skip(1)
            .map(|id| {
                let node = tree.node(id);
                let marker = if id == self.session.current() { "*" } else { " " };
                format!(
                    "{}{}{} {}",
                    marker,
                    "  ".repeat(node.path.len() - 1),
                    node.san.as_deref().unwrap_or(""),
                    node.path
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::DEFAULT_SETUP;

    fn shell() -> Shell {
        let mut options = Options::default();
        options.set(AUTO_MOVE_DELAY, "0");
        Shell::new(Session::default(), options)
    }

    fn run(shell: &mut Shell, line: &str) -> String {
        match shell.handle_command(line) {
            Ok(OkCode::Output(text)) => text,
            Ok(_) => String::new(),
            Err(ErrCode::Failed(e)) => panic!("'{}' failed: {}", line, e),
            Err(_) => panic!("'{}' rejected", line),
        }
    }

    #[test]
    fn edit_then_play() {
        let mut shell = shell();
        run(&mut shell, "clear");
        run(&mut shell, "put K a1");
        run(&mut shell, "put R b1");
        run(&mut shell, "start");
        assert_eq!(shell.session().mode(), Mode::Play);
        assert_eq!(shell.session().tracker().position().board_fen(), "8/8/8/8/8/8/8/KR6");
        run(&mut shell, "reset");
        assert_eq!(shell.session().setup().fen(), DEFAULT_SETUP);
    }

    #[test]
    fn moves_wait_for_the_reply() {
        let mut shell = shell();
        run(&mut shell, "load *");
        let shown = run(&mut shell, "move g1f3");
        assert_eq!(shell.session().mode(), Mode::Play);
        assert_eq!(shell.session().path().to_string(), "g1f3/0000");
        assert!(shown.contains("path: g1f3/0000 (--)"));
        assert!(run(&mut shell, "export").contains("1. Nf3 K"));
        assert!(run(&mut shell, "tree").contains("Nf3 g1f3"));
    }

    #[test]
    fn options_drive_the_session() {
        let mut shell = shell();
        run(&mut shell, "setoption name AutoMove value false");
        run(&mut shell, "load *");
        run(&mut shell, "move g1f3");
        assert_eq!(shell.session().path().to_string(), "g1f3");
        run(&mut shell, "pass");
        assert_eq!(shell.session().path().to_string(), "g1f3/0000");
        assert!(run(&mut shell, "options").contains("option name AutoMove type check default true value false"));
        assert!(matches!(shell.handle_command("setoption name Hash value 1"), Err(ErrCode::BadCommand(_))));
    }

    #[test]
    fn documents_with_escaped_newlines_load() {
        let mut shell = shell();
        run(&mut shell, r#"load [FEN "8/8/8/8/8/8/8/KR6 b - - 0 1"]\n1... Kd5 2. Rb2 *"#);
        run(&mut shell, "last");
        assert_eq!(shell.session().tracker().position().board_fen(), "8/8/8/8/8/8/1R6/K7");
        assert!(run(&mut shell, "status").contains("result: *"));
        run(&mut shell, "goto");
        assert_eq!(shell.session().current(), shell.session().tree().root());
    }

    #[test]
    fn bad_input_is_reported() {
        let mut shell = shell();
        assert!(matches!(shell.handle_command("   "), Err(ErrCode::NoCommand)));
        assert!(matches!(shell.handle_command("dance"), Err(ErrCode::BadCommand(_))));
        assert!(matches!(shell.handle_command("remove"), Err(ErrCode::MissingArg(_))));
        assert!(matches!(shell.handle_command("remove z9"), Err(ErrCode::Failed(Error::InvalidSquare(_)))));
        assert!(matches!(shell.handle_command("next"), Err(ErrCode::Failed(Error::WrongMode(_)))));
        assert!(matches!(shell.handle_command("loadfile /nonexistent/game.pgn"), Err(ErrCode::Failed(Error::Io(_)))));
        assert!(matches!(shell.handle_command("quit"), Ok(OkCode::ShouldQuit)));
    }
}
