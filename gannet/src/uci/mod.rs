//! UCI command parsing.

use std::fmt::Display;
use std::str::FromStr;

use gannet_lib::board::Board;
use gannet_lib::options::{DEFAULT_HASH_MB, DEFAULT_THREADS};

#[macro_use]
mod macros;

uci_options![
    Hash(Spin<usize> { default: DEFAULT_HASH_MB, min: 1, max: 32768 }),
    Threads(Spin<usize> { default: DEFAULT_THREADS, min: 1, max: 256 }),
    SyzygyPath(OptionString { default: "<empty>" }),
];

pub enum UciCommand {
    Uci,
    IsReady,
    SetOption(UciOption),
    UciNewGame,
    Position {
        fen: Option<String>,
        moves: Vec<String>,
    },
    Go {
        wtime: Option<i64>,
        btime: Option<i64>,
        winc: Option<i64>,
        binc: Option<i64>,
        movestogo: Option<u64>,
        depth: Option<i32>,
        nodes: Option<u64>,
        movetime: Option<u64>,
        infinite: bool,
        perft: Option<u32>,
        searchmoves: Vec<String>,
    },
    Stop,
    Quit,
}

#[derive(Debug)]
pub enum UciParseError {
    Empty,
    Other(String),
}

impl Display for UciParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UciParseError::Empty => Ok(()),
            UciParseError::Other(reason) => write!(f, "{reason}"),
        }
    }
}

impl std::error::Error for UciParseError {}

pub trait ValidateOption {
    type Output: FromStr;
    fn validate(&self, data: &str) -> Result<Self::Output, UciParseError>;
    fn details(&self) -> String;
}

pub struct Spin<T> {
    default: T,
    min: T,
    max: T,
}

impl<T: FromStr + PartialOrd + Display> ValidateOption for Spin<T> {
    type Output = T;

    fn validate(&self, data: &str) -> Result<T, UciParseError> {
        let value = data.parse::<T>().map_err(|_| {
            UciParseError::Other(format!("Invalid value for spin option: {data}"))
        })?;

        if value >= self.min && value <= self.max {
            Ok(value)
        } else {
            Err(UciParseError::Other(format!(
                "Value for spin option out of range [{}, {}]",
                self.min, self.max
            )))
        }
    }

    fn details(&self) -> String {
        format!(
            "type spin default {} min {} max {}",
            self.default, self.min, self.max
        )
    }
}

pub struct OptionString {
    default: &'static str,
}

impl ValidateOption for OptionString {
    type Output = String;

    fn validate(&self, data: &str) -> Result<String, UciParseError> {
        Ok(data.to_owned())
    }

    fn details(&self) -> String {
        format!("type string default {}", self.default)
    }
}

macro_rules! parse_uci_go_value {
    ($words:ident, $name:ident, $type:ty) => {
        let $name = {
            if let Some(p) = $words.iter().position(|&w| w == stringify!($name)) {
                match $words.get(p + 1) {
                    Some(n) => Some(n.parse::<$type>().map_err(|_| {
                        UciParseError::Other(format!(
                            concat!(
                                "Invalid value for ",
                                stringify!($name),
                                " in UCI go command: {}"
                            ),
                            n
                        ))
                    })?),
                    None => {
                        return Err(UciParseError::Other(String::from(concat!(
                            "Missing token in UCI go command: no value specified for ",
                            stringify!($name)
                        ))))
                    }
                }
            } else {
                None
            }
        };
    };
}

const GO_KEYWORDS: [&str; 11] = [
    "wtime",
    "btime",
    "winc",
    "binc",
    "movestogo",
    "depth",
    "nodes",
    "movetime",
    "infinite",
    "perft",
    "searchmoves",
];

pub fn parse_uci_command<T: AsRef<str>>(cmd: T) -> Result<UciCommand, UciParseError> {
    let words = cmd.as_ref().split_whitespace().collect::<Vec<&str>>();

    use UciCommand::*;

    let first = match words.first() {
        Some(word) => word,
        None => return Err(UciParseError::Empty),
    };

    match first.to_lowercase().as_str() {
        "uci" => Ok(Uci),
        "isready" => Ok(IsReady),
        "ucinewgame" => Ok(UciNewGame),
        "stop" => Ok(Stop),
        "quit" => Ok(Quit),
        "setoption" => {
            let name = match words.get(1).copied() {
                Some("name") => match words.get(2).copied() {
                    Some(name) => name,
                    None => {
                        return Err(UciParseError::Other(String::from(
                            "Missing token in UCI setoption command: no name specified",
                        )))
                    }
                },
                Some(other) => {
                    return Err(UciParseError::Other(format!(
                        "Unexpected token in UCI setoption command: expected 'name', found {other}"
                    )))
                }
                None => {
                    return Err(UciParseError::Other(String::from(
                        "Missing token in UCI setoption command: 'name' not found",
                    )))
                }
            };
            let value = match words.get(3).copied() {
                Some("value") => match words.get(4..) {
                    // string options may contain spaces
                    Some(rest) if !rest.is_empty() => rest.join(" "),
                    _ => {
                        return Err(UciParseError::Other(String::from(
                            "Missing token in UCI setoption command: no value specified",
                        )))
                    }
                },
                Some(other) => {
                    return Err(UciParseError::Other(format!(
                        "Unexpected token in UCI setoption command: expected 'value', found {other}"
                    )))
                }
                None => {
                    return Err(UciParseError::Other(String::from(
                        "Missing token in UCI setoption command: 'value' not found",
                    )))
                }
            };
            UciOption::parse(name, &value).map(UciCommand::SetOption)
        }
        "position" => {
            let mut test = Board::new();
            let (fen, moves_index) = match words.get(1) {
                Some(&"startpos") => (None, 2),
                Some(&"fen") => match words.get(2..=7) {
                    Some(parts) => {
                        let fen = parts.join(" ");
                        match Board::from_fen(&fen) {
                            Some(board) => test = board,
                            None => {
                                return Err(UciParseError::Other(format!(
                                    "Invalid FEN string in UCI position command: {fen}"
                                )))
                            }
                        }
                        (Some(fen), 8)
                    }
                    None => {
                        return Err(UciParseError::Other(String::from(
                            "Incomplete or missing FEN string in UCI position command",
                        )))
                    }
                },
                Some(other) => {
                    return Err(UciParseError::Other(format!(
                        "Invalid argument in UCI position command: {other}\n\t \
                         Valid arguments are: 'startpos', 'fen [FEN]'"
                    )))
                }
                None => {
                    return Err(UciParseError::Other(String::from(
                        "Missing arguments in UCI position command, expected 'startpos' or 'fen'",
                    )))
                }
            };

            let moves = match words.get(moves_index) {
                Some(&"moves") => {
                    let mut checked = Vec::new();
                    for token in words.get(moves_index + 1..).unwrap_or(&[]) {
                        match test.parse_uci_move(token) {
                            Some(mv) => {
                                test.make_move(&mv);
                                checked.push((*token).to_string());
                            }
                            None => {
                                return Err(UciParseError::Other(format!(
                                    "Illegal move in UCI position command: {token}"
                                )))
                            }
                        }
                    }
                    checked
                }
                Some(other) => {
                    return Err(UciParseError::Other(format!(
                        "Expected 'moves' in UCI position command, found {other}"
                    )))
                }
                None => Vec::new(),
            };

            Ok(Position { fen, moves })
        }
        "go" => {
            parse_uci_go_value!(words, wtime, i64);
            parse_uci_go_value!(words, btime, i64);
            parse_uci_go_value!(words, winc, i64);
            parse_uci_go_value!(words, binc, i64);
            parse_uci_go_value!(words, movestogo, u64);
            parse_uci_go_value!(words, depth, i32);
            parse_uci_go_value!(words, nodes, u64);
            parse_uci_go_value!(words, movetime, u64);
            parse_uci_go_value!(words, perft, u32);

            let infinite = words.iter().any(|&w| w == "infinite");

            let searchmoves = match words.iter().position(|&w| w == "searchmoves") {
                Some(p) => words[p + 1..]
                    .iter()
                    .take_while(|w| !GO_KEYWORDS.contains(w))
                    .map(|w| (*w).to_string())
                    .collect(),
                None => Vec::new(),
            };

            if perft.is_some()
                && (wtime.is_some()
                    || btime.is_some()
                    || movestogo.is_some()
                    || depth.is_some()
                    || nodes.is_some()
                    || movetime.is_some()
                    || infinite)
            {
                return Err(UciParseError::Other(String::from(
                    "Error in UCI go command: 'perft' specified along with other directives",
                )));
            }

            Ok(Go {
                wtime,
                btime,
                winc,
                binc,
                movestogo,
                depth,
                nodes,
                movetime,
                infinite,
                perft,
                searchmoves,
            })
        }
        other => Err(UciParseError::Other(format!("Unknown UCI command: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_go_with_clock_times() {
        let cmd = parse_uci_command("go wtime 1000 btime 2000 winc 10 binc 20").unwrap();
        match cmd {
            UciCommand::Go {
                wtime,
                btime,
                winc,
                binc,
                infinite,
                ..
            } => {
                assert_eq!(wtime, Some(1000));
                assert_eq!(btime, Some(2000));
                assert_eq!(winc, Some(10));
                assert_eq!(binc, Some(20));
                assert!(!infinite);
            }
            _ => panic!("expected go"),
        }
    }

    #[test]
    fn parses_searchmoves_allowlist() {
        let cmd = parse_uci_command("go depth 8 searchmoves e2e4 d2d4").unwrap();
        match cmd {
            UciCommand::Go {
                depth, searchmoves, ..
            } => {
                assert_eq!(depth, Some(8));
                assert_eq!(searchmoves, vec!["e2e4".to_string(), "d2d4".to_string()]);
            }
            _ => panic!("expected go"),
        }
    }

    #[test]
    fn rejects_illegal_position_moves() {
        assert!(parse_uci_command("position startpos moves e2e5").is_err());
        assert!(parse_uci_command("position startpos moves e2e4 e7e5").is_ok());
    }

    #[test]
    fn rejects_bad_fens() {
        assert!(parse_uci_command("position fen not a real fen at all").is_err());
    }

    #[test]
    fn option_values_are_validated() {
        assert!(UciOption::parse("Hash", "64").is_ok());
        assert!(UciOption::parse("Hash", "0").is_err());
        assert!(UciOption::parse("Threads", "four").is_err());
        assert!(UciOption::parse("NoSuchOption", "1").is_err());
    }
}
