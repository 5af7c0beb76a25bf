#![allow(dead_code)]
use rand::seq::index::sample;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use smh::{
    significance, Discoverer, DiscovererParams, Linkage, Linker, LinkerParams, MhRng, Miner,
    MinerParams, PruneParams, Pruner, Result, Row, SamplingBias, SearchIndex, SmhError, Store,
};

pub type MineFn = fn(&Miner, &Store, SamplingBias<'_>, &MhRng) -> Result<Store>;
pub type LinkFn = fn(&Linker, &Store, SamplingBias<'_>, &MhRng) -> Result<Linkage>;
pub type ClusterFn = fn(&Linker, &Store, SamplingBias<'_>, &MhRng) -> Result<Store>;
pub type PruneFn = fn(&Pruner, &mut Store, &Store) -> Result<usize>;
pub type FitFn = fn(&Discoverer, &Store, SamplingBias<'_>, &MhRng) -> Result<Store>;
pub type SearchFn =
    for<'a> fn(&'a Store, MinerParams, SamplingBias<'_>, &MhRng) -> Result<SearchIndex<'a>>;

pub const SHARED_ITEMS: u32 = 8;

/// 1000 rows over 500 items. Rows 0 to 99 share items 0 to 7 and hold two more random items,
/// the other rows are random sets of 10 items.
pub fn planted_group_store() -> Store {
    let mut rng = ChaCha8Rng::seed_from_u64(2015);
    let mut store = Store::new(0, 500);
    for row in 0..1000 {
        let items: Vec<u32> = if row < 100 {
            let mut items: Vec<u32> = (0..SHARED_ITEMS).collect();
            items.extend(sample(&mut rng, 492, 2).into_iter().map(|i| i as u32 + SHARED_ITEMS));
            items
        } else {
            sample(&mut rng, 500, 10).into_iter().map(|i| i as u32).collect()
        };
        for item in items {
            store.push(row, item, 1).unwrap();
        }
    }
    store
}

/// 200 rows over 500 items. Rows 0 to 49 share items 0 to 7, rows 50 to 99 share items 8 to
/// 15, and both hold two more random items out of 16 to 499. Rows 100 to 199 are random sets
/// of 10 items.
pub fn two_planted_groups_store() -> Store {
    let mut rng = ChaCha8Rng::seed_from_u64(2019);
    let mut store = Store::new(0, 500);
    for row in 0..200 {
        let items: Vec<u32> = if row < 100 {
            let offset = if row < 50 { 0 } else { SHARED_ITEMS };
            let mut items: Vec<u32> = (offset..offset + SHARED_ITEMS).collect();
            items.extend(sample(&mut rng, 484, 2).into_iter().map(|i| i as u32 + 16));
            items
        } else {
            sample(&mut rng, 500, 10).into_iter().map(|i| i as u32).collect()
        };
        for item in items {
            store.push(row, item, 1).unwrap();
        }
    }
    store
}

pub fn end_to_end_linker() -> Linker {
    linker_with_min_cluster_size(5)
}

pub fn linker_with_min_cluster_size(min_cluster_size: usize) -> Linker {
    Linker::new(
        LinkerParams::builder()
            .tuple_size(4)
            .number_of_tuples(50)
            .table_size(1 << 16)
            .overlap(0.7)
            .min_cluster_size(min_cluster_size)
            .build(),
    )
}

pub fn end_to_end_miner() -> Miner {
    Miner::new(
        MinerParams::builder()
            .tuple_size(4)
            .number_of_tuples(50)
            .table_size(1 << 16)
            .build(),
    )
}

pub fn test_mine_planted_group(mine_fn: MineFn) {
    let store = planted_group_store();
    let rng = MhRng::new(7);
    let candidates = mine_fn(&end_to_end_miner(), &store, SamplingBias::Uniform, &rng).unwrap();
    assert_eq!(candidates.dim(), store.size());
    assert!(candidates.size() > 0);
    assert!(candidates.iter().any(|c| c.items().all(|row| row < 100)));

    let group_pairs: usize = (0..100_u32)
        .flat_map(|a| (a + 1..100).map(move |b| (a, b)))
        .map(|(a, b)| significance(&candidates, a, b))
        .sum();
    let group_mean = group_pairs as f64 / (100.0 * 99.0 / 2.0);
    // Group rows may meet a random row now and then, sharing a few items by chance
    let cross_pairs: usize = candidates
        .iter()
        .map(|c| {
            let in_group = c.items().filter(|&row| row < 100).count();
            in_group * (c.len() - in_group)
        })
        .sum();
    let cross_mean = cross_pairs as f64 / (100.0 * 900.0);
    assert!(group_mean > 3.0, "group rows met in {group_mean} tables on average");
    assert!(group_mean > 100.0 * cross_mean, "{group_mean} vs {cross_mean}");
}

pub fn test_link_planted_group(link_fn: LinkFn) {
    let store = planted_group_store();
    let rng = MhRng::new(7);
    let linkage = link_fn(&end_to_end_linker(), &store, SamplingBias::Uniform, &rng).unwrap();
    assert_eq!(linkage.labels.len(), 1000);
    let in_group = linkage.labels[..100].iter().filter(|&&label| label == 0).count();
    assert!(in_group >= 90, "only {in_group} group rows in cluster 0");
    assert!(linkage.labels[100..].iter().all(|&label| label != 0));
    let cluster = linkage.clusters.row(0).unwrap();
    assert!(cluster.items().all(|row| row < 100));
}

pub fn test_cluster_planted_group(cluster_fn: ClusterFn) {
    let store = planted_group_store();
    let rng = MhRng::new(7);
    let model = cluster_fn(&end_to_end_linker(), &store, SamplingBias::Uniform, &rng).unwrap();
    assert!(model.size() >= 1);
    let top: Vec<u32> = model.row(0).unwrap().items().take(SHARED_ITEMS as usize).collect();
    assert_eq!(top, (0..SHARED_ITEMS).collect::<Vec<_>>());
    let weights: Vec<u32> = model.row(0).unwrap().entries().iter().map(|e| e.weight).collect();
    assert!(weights[0] >= 90);
    assert!(weights.windows(2).all(|w| w[0] >= w[1]));
}

pub fn test_reclustering_models_is_stable(cluster_fn: ClusterFn) {
    let store = two_planted_groups_store();
    let rng = MhRng::new(21);
    let models = cluster_fn(&end_to_end_linker(), &store, SamplingBias::Uniform, &rng).unwrap();
    assert_eq!(models.size(), 2);
    let top = |model: usize| -> Vec<u32> {
        models.row(model).unwrap().items().take(SHARED_ITEMS as usize).collect()
    };
    assert_eq!(top(0), (0..SHARED_ITEMS).collect::<Vec<_>>());
    assert_eq!(top(1), (SHARED_ITEMS..2 * SHARED_ITEMS).collect::<Vec<_>>());

    // Every model is a cluster on its own, so the two stay apart and come back unchanged
    let single = linker_with_min_cluster_size(1);
    let again = cluster_fn(&single, &models, SamplingBias::Uniform, &rng).unwrap();
    assert_eq!(again, models);
}

pub fn test_mining_is_reproducible(mine_fn: MineFn) {
    let store = planted_group_store();
    let miner = Miner::new(
        MinerParams::builder()
            .tuple_size(3)
            .number_of_tuples(8)
            .table_size(1 << 12)
            .build(),
    );
    let a = mine_fn(&miner, &store, SamplingBias::Uniform, &MhRng::new(99)).unwrap();
    let b = mine_fn(&miner, &store, SamplingBias::Uniform, &MhRng::new(99)).unwrap();
    let c = mine_fn(&miner, &store, SamplingBias::Uniform, &MhRng::new(100)).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

pub fn test_empty_store(mine_fn: MineFn, link_fn: LinkFn) {
    let store = Store::new(0, 0);
    let rng = MhRng::new(1);
    let candidates = mine_fn(&Miner::default(), &store, SamplingBias::Uniform, &rng).unwrap();
    assert_eq!(candidates.size(), 0);
    let linkage = link_fn(&Linker::default(), &store, SamplingBias::Uniform, &rng).unwrap();
    assert_eq!(linkage.clusters.size(), 0);
    assert!(linkage.labels.is_empty());
}

pub fn test_invalid_parameters(mine_fn: MineFn, link_fn: LinkFn) {
    let store = planted_group_store();
    let rng = MhRng::new(1);
    let too_long = Miner::new(MinerParams::builder().tuple_size(501).build());
    assert!(matches!(
        mine_fn(&too_long, &store, SamplingBias::Uniform, &rng),
        Err(SmhError::InvalidParameter { name: "tuple_size", .. })
    ));
    let no_tables = Miner::new(MinerParams::builder().number_of_tuples(0).build());
    assert!(mine_fn(&no_tables, &store, SamplingBias::Uniform, &rng).is_err());
    let bad_overlap = Linker::new(LinkerParams::builder().overlap(-0.1).build());
    assert!(matches!(
        link_fn(&bad_overlap, &store, SamplingBias::Uniform, &rng),
        Err(SmhError::InvalidParameter { name: "overlap", .. })
    ));
}

pub fn test_table_full(mine_fn: MineFn) {
    let store = planted_group_store();
    let tiny = Miner::new(
        MinerParams::builder()
            .tuple_size(2)
            .number_of_tuples(1)
            .table_size(4)
            .build(),
    );
    assert!(matches!(
        mine_fn(&tiny, &store, SamplingBias::Uniform, &MhRng::new(1)),
        Err(SmhError::TableFull { table_size: 4 })
    ));
}

/// Docs 0 to 149 hold terms 0 to 3 and three random terms out of 10 to 39, docs 150 to 299
/// hold four random terms out of 4 to 39.
pub fn planted_topic_corpus() -> Store {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut corpus = Store::new(0, 40);
    for doc in 0..300 {
        let terms: Vec<u32> = if doc < 150 {
            let mut terms = vec![0, 1, 2, 3];
            terms.extend(sample(&mut rng, 30, 3).into_iter().map(|t| t as u32 + 10));
            terms
        } else {
            sample(&mut rng, 36, 4).into_iter().map(|t| t as u32 + 4).collect()
        };
        for term in terms {
            corpus.push(doc, term, 1).unwrap();
        }
    }
    corpus
}

pub fn test_discover_planted_topic(fit_fn: FitFn) {
    let index = planted_topic_corpus().invert();
    let mining = MinerParams::builder()
        .tuple_size(3)
        .number_of_tuples(20)
        .table_size(1 << 10)
        .build();
    let linking = LinkerParams::builder()
        .tuple_size(2)
        .number_of_tuples(20)
        .table_size(1 << 10)
        .build();
    let params = DiscovererParams::builder()
        .mining(mining)
        .min_set_size(3)
        .linking(linking)
        .build();
    let discoverer = Discoverer::new(params);
    let models = fit_fn(&discoverer, &index, SamplingBias::Uniform, &MhRng::new(3)).unwrap();
    assert!(models.iter().any(|model| {
        let mut top: Vec<u32> = model.items().take(4).collect();
        top.sort_unstable();
        top == vec![0, 1, 2, 3]
    }));
}

/// Inverted index of four docs: {0, 1, 2}, {0, 1, 2}, {0, 1, 3} and {3, 4}.
pub fn small_inverted_index() -> Store {
    let mut corpus = Store::new(0, 5);
    let docs = [vec![0, 1, 2], vec![0, 1, 2], vec![0, 1, 3], vec![3, 4]];
    for (doc, terms) in docs.iter().enumerate() {
        for &term in terms {
            corpus.push(doc, term, 1).unwrap();
        }
    }
    corpus.invert()
}

pub fn test_prune_exact_survivors(prune_fn: PruneFn) {
    let index = small_inverted_index();
    let mut candidates = Store::from_rows(
        vec![
            Row::from_items([0, 1, 2, 4]),
            Row::from_items([3, 4]),
            Row::from_items([2, 3]),
            Row::from_items([0, 1, 2]),
        ],
        5,
    )
    .unwrap();
    let removed = prune_fn(&Pruner::new(PruneParams::default()), &mut candidates, &index).unwrap();
    assert_eq!(removed, 2);
    let survivors: Vec<Vec<u32>> = candidates.iter().map(|c| c.items().collect()).collect();
    assert_eq!(survivors, vec![vec![0, 1, 2], vec![0, 1, 2]]);
}

pub fn test_search_finds_indexed_rows(search_fn: SearchFn) {
    let store = planted_group_store();
    let params = MinerParams::builder()
        .tuple_size(3)
        .number_of_tuples(16)
        .table_size(1 << 12)
        .build();
    let index = search_fn(&store, params, SamplingBias::Uniform, &MhRng::new(5)).unwrap();
    for row_id in [0_usize, 50, 500, 999] {
        let result = index.query(store.row(row_id).unwrap()).unwrap();
        assert_eq!(result.weight_of(row_id as u32), Some(16));
    }
    // A group row meets other group rows
    let result = index.query(store.row(10).unwrap()).unwrap();
    assert!(result.items().filter(|&id| id < 100).count() > 1);
}
