//! UCI front-end. The search itself runs on this thread; a reader thread
//! accepts input so `stop` can interrupt a running search through the
//! cooperative stop flag.

use indicatif::{ProgressBar, ProgressStyle};
use seajay::board::Board;
use seajay::moves::execute::make_move;
use seajay::moves::magic::MagicTables;
use seajay::moves::magic::loader::magic_tables;
use seajay::moves::parse_uci_move;
use seajay::moves::perft::{perft, perft_divide};
use seajay::search::info::{IterationInfo, ProgressSink, format_score};
use seajay::search::time::SearchLimits;
use seajay::search::{SearchResult, Searcher};
use std::io::{self, BufRead};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const ENGINE_NAME: &str = "SeaJay 0.1";
const ENGINE_AUTHOR: &str = "SeaJay authors";

fn main() {
    seajay::logger::init_logging("logs/seajay.log", "seajay=info");

    let tables = magic_tables();
    let mut board = Board::new();
    let mut searcher = Searcher::default();
    let stop = searcher.stop_handle();

    let rx = spawn_reader(stop.clone());

    for line in rx {
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();

        match parts[0] {
            "uci" => handle_uci(),
            "isready" => println!("readyok"),
            "ucinewgame" => {
                board = Board::new();
                searcher.new_game();
            }
            "position" => {
                if let Some(new_board) = handle_position(&parts, tables) {
                    board = new_board;
                }
            }
            "go" => {
                let limits = parse_go(&parts);
                let result = run_search(&mut searcher, &mut board, tables, &limits);
                println!("bestmove {}", result.best_move);
            }
            "setoption" => handle_setoption(&parts, &mut searcher),
            "stop" => {} // the reader thread already raised the flag
            "fen" => println!("{}", board.to_fen()),
            "d" | "display" => println!("{}", board),
            "perft" => handle_perft(&parts, &mut board, tables),
            "divide" => handle_divide(&parts, &mut board, tables),
            "quit" => break,
            _ => {}
        }
    }
}

/// Forward stdin lines over a channel; `stop`/`quit` additionally raise
/// the cooperative stop flag immediately, even mid-search.
fn spawn_reader(stop: Arc<AtomicBool>) -> mpsc::Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let trimmed = line.trim();
            if trimmed == "stop" || trimmed == "quit" {
                stop.store(true, Ordering::Relaxed);
            }
            if tx.send(line).is_err() {
                break;
            }
        }
        let _ = tx.send("quit".to_string());
    });
    rx
}

fn handle_uci() {
    println!("id name {}", ENGINE_NAME);
    println!("id author {}", ENGINE_AUTHOR);
    println!("option name Hash type spin default 16 min 1 max 4096");
    println!("option name UseTranspositionTable type check default true");
    println!("option name Clear Hash type button");
    println!("uciok");
}

fn handle_position(parts: &[&str], tables: &MagicTables) -> Option<Board> {
    let mut board = if parts.get(1) == Some(&"startpos") {
        Board::new()
    } else if parts.get(1) == Some(&"fen") {
        let fen_end = parts
            .iter()
            .position(|&p| p == "moves")
            .unwrap_or(parts.len());
        let fen = parts.get(2..fen_end)?.join(" ");
        match Board::from_fen(&fen) {
            Ok(b) => b,
            Err(e) => {
                println!("info string invalid fen: {}", e);
                return None;
            }
        }
    } else {
        return None;
    };

    if let Some(moves_idx) = parts.iter().position(|&p| p == "moves") {
        for text in &parts[moves_idx + 1..] {
            match parse_uci_move(&board, tables, text) {
                Ok(mv) => {
                    make_move(&mut board, mv);
                }
                Err(e) => {
                    println!("info string {}", e);
                    return None;
                }
            }
        }
    }

    Some(board)
}

fn parse_go(parts: &[&str]) -> SearchLimits {
    let mut limits = SearchLimits::default();

    let mut i = 1;
    while i < parts.len() {
        let arg = |offset: usize| parts.get(i + offset).copied();
        match parts[i] {
            "depth" => {
                limits.depth = arg(1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "movetime" => {
                limits.movetime = arg(1)
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis);
                i += 2;
            }
            "wtime" => {
                limits.wtime = arg(1)
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis);
                i += 2;
            }
            "btime" => {
                limits.btime = arg(1)
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis);
                i += 2;
            }
            "winc" => {
                limits.winc = arg(1)
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or_default();
                i += 2;
            }
            "binc" => {
                limits.binc = arg(1)
                    .and_then(|v| v.parse().ok())
                    .map(Duration::from_millis)
                    .unwrap_or_default();
                i += 2;
            }
            "movestogo" => {
                limits.movestogo = arg(1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "nodes" => {
                limits.nodes = arg(1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "infinite" => {
                limits.infinite = true;
                i += 1;
            }
            _ => i += 1,
        }
    }

    limits
}

struct UciSink;

impl ProgressSink for UciSink {
    fn on_iteration(&mut self, info: &IterationInfo) {
        let mut line = format!(
            "info depth {} seldepth {} score {} nodes {} nps {} time {} hashfull {}",
            info.depth,
            info.seldepth,
            format_score(info.score),
            info.total_nodes,
            info.nps,
            info.elapsed.as_millis(),
            info.hashfull,
        );
        if info.pv.is_empty() {
            line.push_str(&format!(" pv {}", info.best_move));
        } else {
            line.push_str(" pv");
            for mv in &info.pv {
                line.push_str(&format!(" {}", mv));
            }
        }
        println!("{}", line);
    }
}

fn run_search(
    searcher: &mut Searcher,
    board: &mut Board,
    tables: &MagicTables,
    limits: &SearchLimits,
) -> SearchResult {
    let mut sink = UciSink;
    searcher.search(board, tables, limits, &mut sink)
}

fn handle_setoption(parts: &[&str], searcher: &mut Searcher) {
    let Some(name_idx) = parts.iter().position(|&p| p == "name") else {
        return;
    };
    let value_idx = parts.iter().position(|&p| p == "value");
    let name = parts[name_idx + 1..value_idx.unwrap_or(parts.len())]
        .join(" ")
        .to_ascii_lowercase();
    let value = value_idx.map(|i| parts[i + 1..].join(" "));

    match name.as_str() {
        "hash" => {
            if let Some(mb) = value.as_deref().and_then(|v| v.parse::<usize>().ok()) {
                searcher.resize_tt(mb.clamp(1, 4096));
            }
        }
        "usetranspositiontable" => {
            let enabled = value.as_deref().is_none_or(|v| v.eq_ignore_ascii_case("true"));
            searcher.set_tt_enabled(enabled);
        }
        "clear hash" => searcher.clear_tt(),
        _ => {}
    }
}

fn handle_perft(parts: &[&str], board: &mut Board, tables: &MagicTables) {
    let depth: u32 = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(5);
    let start = Instant::now();
    let nodes = perft(board, tables, depth);
    let elapsed = start.elapsed();
    let nps = (nodes as f64 / elapsed.as_secs_f64().max(1e-9)) as u64;
    println!(
        "perft({}) = {} ({} ms, {} nps)",
        depth,
        nodes,
        elapsed.as_millis(),
        nps
    );
}

fn handle_divide(parts: &[&str], board: &mut Board, tables: &MagicTables) {
    let depth: u32 = parts.get(1).and_then(|v| v.parse().ok()).unwrap_or(4);

    let results = if depth <= 1 {
        perft_divide(board, tables, depth)
    } else {
        // drive each root move separately so the bar ticks along
        let mut legal = Vec::with_capacity(64);
        let mut scratch = Vec::with_capacity(256);
        seajay::moves::execute::generate_legal(board, tables, &mut legal, &mut scratch);

        let bar = ProgressBar::new(legal.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("{bar:30} {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        let mut results = Vec::with_capacity(legal.len());
        for &mv in &legal {
            bar.set_message(mv.to_string());
            let undo = make_move(board, mv);
            let count = perft(board, tables, depth - 1);
            seajay::moves::execute::unmake_move(board, mv, undo);
            results.push((mv, count));
            bar.inc(1);
        }
        bar.finish_and_clear();
        results
    };

    let mut total = 0;
    for (mv, count) in &results {
        println!("{}: {}", mv, count);
        total += count;
    }
    println!("Total: {}", total);
}
