use smh::{
    Discoverer, Linkage, Linker, MhRng, Miner, MinerParams, Pruner, Result, SamplingBias,
    SearchIndex, Store,
};

mod common;

fn mine_fn(miner: &Miner, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
    miner.mine(store, bias, rng)
}

fn link_fn(linker: &Linker, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Linkage> {
    linker.link(store, bias, rng)
}

fn cluster_fn(
    linker: &Linker,
    store: &Store,
    bias: SamplingBias<'_>,
    rng: &MhRng,
) -> Result<Store> {
    linker.cluster(store, bias, rng)
}

fn prune_fn(pruner: &Pruner, candidates: &mut Store, index: &Store) -> Result<usize> {
    pruner.prune(candidates, index)
}

fn fit_fn(
    discoverer: &Discoverer,
    index: &Store,
    bias: SamplingBias<'_>,
    rng: &MhRng,
) -> Result<Store> {
    discoverer.fit(index, bias, rng)
}

fn search_fn<'a>(
    store: &'a Store,
    params: MinerParams,
    bias: SamplingBias<'_>,
    rng: &MhRng,
) -> Result<SearchIndex<'a>> {
    SearchIndex::build(store, params, bias, rng)
}

macro_rules! define_serial_test {
    ($test_fn:ident, $($op:ident),+) => {
        #[test]
        fn $test_fn() {
            common::$test_fn($($op),+);
        }
    };
}

define_serial_test!(test_mine_planted_group, mine_fn);
define_serial_test!(test_link_planted_group, link_fn);
define_serial_test!(test_cluster_planted_group, cluster_fn);
define_serial_test!(test_reclustering_models_is_stable, cluster_fn);
define_serial_test!(test_mining_is_reproducible, mine_fn);
define_serial_test!(test_empty_store, mine_fn, link_fn);
define_serial_test!(test_invalid_parameters, mine_fn, link_fn);
define_serial_test!(test_table_full, mine_fn);
define_serial_test!(test_discover_planted_topic, fit_fn);
define_serial_test!(test_prune_exact_survivors, prune_fn);
define_serial_test!(test_search_finds_indexed_rows, search_fn);
