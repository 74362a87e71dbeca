//! Worker pool for lazy SMP.
//!
//! `go` launches one search thread per configured worker, each with its
//! own clone of the board and private heuristic state. The workers share
//! nothing but the transposition table and the stop flag; helper threads
//! exist purely to fill the table from slightly different trees. Worker
//! 0 owns time management and all UCI output.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{Builder, JoinHandle};

use crate::board::Board;
use crate::limits::SearchLimits;
use crate::search::Search;
use crate::tablebase::SyzygyTablebase;
use crate::transposition_table::TranspositionTable;

/// Recursion to `MAX_PLY` needs more headroom than some platforms'
/// default thread stack.
const WORKER_STACK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Default)]
pub struct WorkerCounters {
    pub nodes: AtomicU64,
    pub tb_hits: AtomicU64,
}

pub struct ThreadPool {
    pub threads: usize,
    tt: TranspositionTable,
    tb: Option<Arc<SyzygyTablebase>>,
    stop: Arc<AtomicBool>,
    counters: Vec<Arc<WorkerCounters>>,
    handles: Vec<JoinHandle<()>>,
}

impl ThreadPool {
    pub fn new(tt: TranspositionTable) -> Self {
        Self {
            threads: 1,
            tt,
            tb: None,
            stop: Arc::new(AtomicBool::new(false)),
            counters: Vec::new(),
            handles: Vec::new(),
        }
    }

    pub fn set_threads(&mut self, threads: usize) {
        self.threads = threads.max(1);
    }

    pub fn set_tablebase(&mut self, tb: Option<Arc<SyzygyTablebase>>) {
        self.tb = tb;
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop.clone()
    }

    /// Launch a search of `board` on every worker. Returns immediately;
    /// worker 0 prints `bestmove` when it finishes.
    pub fn go(&mut self, board: &Board, limits: SearchLimits) {
        self.stop();
        self.wait();

        self.stop.store(false, Ordering::Relaxed);
        self.tt.new_search();

        self.counters = (0..self.threads)
            .map(|_| Arc::new(WorkerCounters::default()))
            .collect();
        let all_counters = Arc::new(self.counters.clone());

        for id in 0..self.threads {
            let mut search = Search::new(board.clone(), self.tt.clone(), self.stop.clone())
                .limits(limits.clone())
                .tablebase(self.tb.clone())
                .worker(id, all_counters.clone());

            let handle = Builder::new()
                .name(format!("gannet-worker-{id}"))
                .stack_size(WORKER_STACK_SIZE)
                .spawn(move || {
                    search.think();
                });
            match handle {
                Ok(handle) => self.handles.push(handle),
                Err(_) => break,
            }
        }
    }

    /// Request a cooperative stop; workers notice at their next limit
    /// check.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }

    /// Join all outstanding workers.
    pub fn wait(&mut self) {
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }

    pub fn is_searching(&self) -> bool {
        !self.handles.is_empty() && !self.stop.load(Ordering::Relaxed)
    }

    pub fn get_nodes(&self) -> u64 {
        self.counters
            .iter()
            .map(|c| c.nodes.load(Ordering::Relaxed))
            .sum()
    }

    pub fn get_tb_hits(&self) -> u64 {
        self.counters
            .iter()
            .map(|c| c.tb_hits.load(Ordering::Relaxed))
            .sum()
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        self.stop();
        self.wait();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limits::TimeLimit;

    #[test]
    fn pool_runs_all_workers_and_stops_on_time() {
        let tt = TranspositionTable::new(4);
        let mut pool = ThreadPool::new(tt);
        pool.set_threads(4);

        let board = Board::new();
        let mut limits = SearchLimits::default();
        limits.time = TimeLimit::move_time(200);
        pool.go(&board, limits);
        pool.wait();

        assert_eq!(pool.counters.len(), 4);
        for counters in &pool.counters {
            assert!(counters.nodes.load(Ordering::Relaxed) > 0);
        }
        assert!(pool.get_nodes() > 0);
        assert!(pool.stop.load(Ordering::Relaxed));
    }

    #[test]
    fn explicit_stop_ends_a_depth_limited_search() {
        let tt = TranspositionTable::new(4);
        let mut pool = ThreadPool::new(tt);

        let board = Board::new();
        pool.go(&board, SearchLimits::depth(5));
        pool.wait();
        assert!(pool.get_nodes() > 0);
    }
}
