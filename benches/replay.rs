use criterion::{criterion_group, criterion_main, Criterion};
use invisible_king::board::Board;
use invisible_king::document::load;
use invisible_king::reconstruct::reconstruct;
use invisible_king::tree::GameTree;

// Knight shuffles that keep the game undecided, with side lines
const GAME: &str = "1. Nf3 -- 2. Ng5 -- (2. Nh4 -- 3. Nf3) 3. Nh3 -- 4. Ng1 -- 5. Nf3 -- (5. Nh3 --) 6. Nh4 -- 7. Nf3 -- 8. Ng1 -- *";

fn replay_bench(c: &mut Criterion) {
    c.bench_function("load with variations", |b| b.iter(|| load::<Board>(GAME).unwrap()));

    let tree: GameTree = load(GAME).unwrap();
    let end = *tree.mainline().last().unwrap();
    let path = tree.path_of(end).clone();
    c.bench_function("reconstruct mainline", |b| b.iter(|| reconstruct(&tree, &path).unwrap()));
}

criterion_group!(benches, replay_bench);
criterion_main!(benches);
