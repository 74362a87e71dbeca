use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};

use gannet_lib::board::Board;
use gannet_lib::limits::SearchLimits;
use gannet_lib::search::Search;
use gannet_lib::transposition_table::TranspositionTable;

fn search_middlegame(c: &mut Criterion) {
    let fen = "r1bq1rk1/pp2bppp/2n1pn2/3p4/3P4/2NBPN2/PP3PPP/R1BQ1RK1 w - - 0 9";

    c.bench_function("search depth 6", |b| {
        b.iter(|| {
            let board = Board::from_fen(fen).unwrap();
            let tt = TranspositionTable::new(16);
            let stop = Arc::new(AtomicBool::new(false));
            let mut search = Search::new(board, tt, stop)
                .limits(SearchLimits::depth(6))
                .silent();
            search.think()
        })
    });
}

criterion_group!(benches, search_middlegame);
criterion_main!(benches);
