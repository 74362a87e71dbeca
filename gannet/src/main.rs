use std::error::Error;
use std::io::{prelude::*, stdin};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use gannet_lib::board::{Board, PackedMove};
use gannet_lib::limits::{SearchLimits, TimeLimit};
use gannet_lib::options::EngineOptions;
use gannet_lib::score::MAX_PLY;
use gannet_lib::search::Search;
use gannet_lib::shakmaty::{perft, Color};
use gannet_lib::tablebase::SyzygyTablebase;
use gannet_lib::thread_pool::ThreadPool;
use gannet_lib::transposition_table::TranspositionTable;

mod uci;

const NAME: &str = concat!("Gannet ", env!("CARGO_PKG_VERSION"));

fn main() -> Result<(), Box<dyn Error>> {
    let mut options = EngineOptions::default();
    let tt = TranspositionTable::new(options.hash_mb);
    let mut pool = ThreadPool::new(tt.clone());
    let mut board = Board::new();

    if std::env::args().nth(1).as_deref() == Some("bench") {
        return bench();
    }

    for line in stdin().lock().lines() {
        let cmd = match uci::parse_uci_command(line?) {
            Ok(cmd) => cmd,
            Err(uci::UciParseError::Empty) => continue,
            Err(uci::UciParseError::Other(e)) => {
                println!("{e}");
                continue;
            }
        };

        match cmd {
            uci::UciCommand::Uci => {
                println!("id name {NAME}");
                println!("id author the Gannet developers");
                uci::print_uci_options();
                println!("uciok");
            }
            uci::UciCommand::IsReady => println!("readyok"),
            uci::UciCommand::SetOption(opt) => match opt {
                uci::UciOption::Hash(mb) => {
                    options.hash_mb = mb;
                    tt.set_size(mb);
                }
                uci::UciOption::Threads(threads) => {
                    options.threads = threads;
                    pool.set_threads(threads);
                }
                uci::UciOption::SyzygyPath(path) => {
                    if path == "<empty>" {
                        options.syzygy_path = None;
                        pool.set_tablebase(None);
                    } else {
                        match SyzygyTablebase::load(&path) {
                            Some(tb) => {
                                println!(
                                    "info string syzygy tablebases loaded, up to {} pieces",
                                    tb.max_pieces()
                                );
                                options.syzygy_path = Some(path);
                                pool.set_tablebase(Some(Arc::new(tb)));
                            }
                            None => println!("info string no syzygy tables found at {path}"),
                        }
                    }
                }
            },
            uci::UciCommand::UciNewGame => {
                pool.stop();
                pool.wait();
                board = Board::new();
                tt.clear();
            }
            uci::UciCommand::Position { fen, moves } => {
                board = match fen {
                    Some(fen) => match Board::from_fen(&fen) {
                        Some(board) => board,
                        None => continue,
                    },
                    None => Board::new(),
                };
                for token in &moves {
                    match board.parse_uci_move(token) {
                        Some(mv) => board.make_move(&mv),
                        None => break,
                    }
                }
            }
            uci::UciCommand::Go {
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
            } => {
                if let Some(depth) = perft {
                    run_perft(&board, depth);
                    continue;
                }

                let time = if infinite {
                    TimeLimit::default()
                } else if let Some(ms) = movetime {
                    TimeLimit::move_time(ms)
                } else {
                    let (clock, increment) = match board.side_to_move() {
                        Color::White => (wtime, winc),
                        Color::Black => (btime, binc),
                    };
                    match clock {
                        Some(remaining) => TimeLimit::for_clock(
                            remaining.max(0) as u64,
                            increment.unwrap_or(0).max(0) as u64,
                            movestogo,
                        ),
                        None => TimeLimit::default(),
                    }
                };

                let mut limits = SearchLimits {
                    depth: depth.unwrap_or(MAX_PLY as i32).clamp(1, MAX_PLY as i32),
                    nodes: nodes.unwrap_or(0),
                    time,
                    search_moves: Vec::new(),
                };
                for token in &searchmoves {
                    if let Some(mv) = board.parse_uci_move(token) {
                        limits.search_moves.push(PackedMove::pack(&mv));
                    }
                }

                pool.go(&board, limits);
            }
            uci::UciCommand::Stop => pool.stop(),
            uci::UciCommand::Quit => {
                pool.stop();
                break;
            }
        }
    }

    Ok(())
}

fn run_perft(board: &Board, depth: u32) {
    let start = Instant::now();
    let mut total = 0u64;
    for mv in board.legal_moves() {
        let mut child = board.clone();
        child.make_move(&mv);
        let count = if depth > 1 {
            perft(child.position(), depth - 1)
        } else {
            1
        };
        total += count;
        println!("{}: {count}", board.uci(&mv));
    }
    let elapsed = start.elapsed();
    println!(
        "\n{total} nodes in {} ms ({:.0} nps)",
        elapsed.as_millis(),
        total as f64 / elapsed.as_secs_f64()
    );
}

fn bench() -> Result<(), Box<dyn Error>> {
    let board = Board::new();
    let tt = TranspositionTable::new(16);
    let stop = Arc::new(AtomicBool::new(false));
    let mut search = Search::new(board, tt, stop)
        .limits(SearchLimits::depth(12))
        .silent();

    let start = Instant::now();
    search.think();
    let elapsed = start.elapsed();

    let nodes = search.nodes();
    let nps = (nodes as f64 / elapsed.as_secs_f64()) as u64;
    println!("{nodes} nodes {nps} nps");
    Ok(())
}
