use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use smh::{
    Linker, LinkerParamBuilder, LinkerParams, MhRng, Miner, MinerParams, PruneParams, Pruner,
    Result, SamplingBias, SearchIndex, SimilarityMeasure, Store, Weights,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "smh")]
#[command(version)]
#[command(about = "Sampled Min-Hashing: mine and cluster co-occurring items of sparse sets")]
struct Cli {
    /// Seed of the random engine. Drawn at random (and logged) when missing.
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Hash rows on the rayon thread pool. Needs the `parallel` feature.
    #[arg(long, global = true)]
    parallel: bool,

    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Mine candidate sets from a set store (usually an inverted index).
    Mine {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        hashing: HashingArgs,
        #[command(flatten)]
        bias: BiasArgs,
    },
    /// Filter candidate sets against the inverted index they were mined from.
    Prune {
        candidates: PathBuf,
        index: PathBuf,
        output: PathBuf,
        #[arg(long, default_value_t = 3)]
        min_size: usize,
        #[arg(long, default_value_t = 1)]
        min_hits: usize,
        #[arg(long, default_value_t = 0.7)]
        overlap: f64,
        #[arg(long, default_value_t = 0.5)]
        cooc_threshold: f64,
    },
    /// Cluster the rows of a set store into models.
    Cluster {
        input: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        hashing: HashingArgs,
        #[arg(long, default_value_t = 0.7)]
        overlap: f64,
        #[arg(long, default_value_t = 3)]
        min_cluster_size: usize,
        /// Gate links with the Jaccard similarity instead of the overlap coefficient.
        #[arg(long)]
        jaccard: bool,
        #[command(flatten)]
        bias: BiasArgs,
    },
    /// Remove rows with too few or too many items.
    Cutoff {
        input: PathBuf,
        output: PathBuf,
        #[arg(long)]
        min_size: Option<usize>,
        #[arg(long)]
        max_size: Option<usize>,
    },
    /// Write the inverted index of a set store.
    Invert { input: PathBuf, output: PathBuf },
    /// Find the indexed rows colliding with every query row.
    Search {
        index: PathBuf,
        queries: PathBuf,
        output: PathBuf,
        #[command(flatten)]
        hashing: HashingArgs,
        #[command(flatten)]
        bias: BiasArgs,
    },
}

#[derive(Args)]
struct HashingArgs {
    /// Min-Hash values per tuple [default: 3]
    #[arg(short = 'r', long)]
    tuple_size: Option<usize>,
    /// Number of tuples, i.e. hash tables [default: 255]
    #[arg(short = 'l', long)]
    number_of_tuples: Option<usize>,
    /// Buckets per hash table [default: 2^19 for mining and search, 2^20 for clustering]
    #[arg(long)]
    table_size: Option<usize>,
}

impl HashingArgs {
    fn miner_params(&self) -> MinerParams {
        let mut builder = MinerParams::builder();
        if let Some(tuple_size) = self.tuple_size {
            builder = builder.tuple_size(tuple_size);
        }
        if let Some(number_of_tuples) = self.number_of_tuples {
            builder = builder.number_of_tuples(number_of_tuples);
        }
        if let Some(table_size) = self.table_size {
            builder = builder.table_size(table_size);
        }
        builder.build()
    }

    fn linker_params(&self) -> LinkerParamBuilder {
        let mut builder = LinkerParams::builder();
        if let Some(tuple_size) = self.tuple_size {
            builder = builder.tuple_size(tuple_size);
        }
        if let Some(number_of_tuples) = self.number_of_tuples {
            builder = builder.number_of_tuples(number_of_tuples);
        }
        if let Some(table_size) = self.table_size {
            builder = builder.table_size(table_size);
        }
        builder
    }
}

#[derive(Args)]
struct BiasArgs {
    /// Weights file biasing item selection.
    #[arg(long)]
    weights: Option<PathBuf>,
    /// Expand rows against this reference store instead of weighting ranks.
    #[arg(long)]
    expand: Option<PathBuf>,
}

struct LoadedBias {
    weights: Option<Weights>,
    reference: Option<Store>,
}

impl LoadedBias {
    fn load(args: &BiasArgs) -> Result<Self> {
        let weights = args.weights.as_ref().map(smh::load_weights).transpose()?;
        let reference = args.expand.as_ref().map(smh::load).transpose()?;
        Ok(LoadedBias { weights, reference })
    }

    fn bias(&self) -> SamplingBias<'_> {
        match (&self.reference, &self.weights) {
            (Some(reference), weights) => {
                SamplingBias::Expanded { reference, weights: weights.as_ref() }
            }
            (None, Some(weights)) => SamplingBias::Weighted(weights),
            (None, None) => SamplingBias::Uniform,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let rng = match cli.seed {
        Some(seed) => MhRng::new(seed),
        None => MhRng::from_entropy(),
    };
    info!("Using seed {}", rng.seed());
    let parallel = cli.parallel && cfg!(feature = "parallel");
    if cli.parallel && !parallel {
        warn!("SMH_WARNING: built without the parallel feature. Running serially.");
    }

    match cli.command {
        Commands::Mine { input, output, hashing, bias } => {
            let store = smh::load(&input)?;
            let bias = LoadedBias::load(&bias)?;
            let miner = Miner::new(hashing.miner_params());
            let candidates = if parallel {
                mine_par(&miner, &store, bias.bias(), &rng)?
            } else {
                miner.mine(&store, bias.bias(), &rng)?
            };
            smh::save(&candidates, &output)
        }
        Commands::Prune {
            candidates,
            index,
            output,
            min_size,
            min_hits,
            overlap,
            cooc_threshold,
        } => {
            let mut candidates = smh::load(&candidates)?;
            let index = smh::load(&index)?;
            let params = PruneParams::builder()
                .min_size(min_size)
                .min_hits(min_hits)
                .overlap(overlap)
                .cooc_threshold(cooc_threshold)
                .build();
            let pruner = Pruner::new(params);
            if parallel {
                prune_par(&pruner, &mut candidates, &index)?;
            } else {
                pruner.prune(&mut candidates, &index)?;
            }
            smh::save(&candidates, &output)
        }
        Commands::Cluster {
            input,
            output,
            hashing,
            overlap,
            min_cluster_size,
            jaccard,
            bias,
        } => {
            let store = smh::load(&input)?;
            let bias = LoadedBias::load(&bias)?;
            let measure = if jaccard {
                SimilarityMeasure::Jaccard
            } else {
                SimilarityMeasure::Overlap
            };
            let params = hashing
                .linker_params()
                .overlap(overlap)
                .min_cluster_size(min_cluster_size)
                .measure(measure)
                .build();
            let linker = Linker::new(params);
            let models = if parallel {
                cluster_par(&linker, &store, bias.bias(), &rng)?
            } else {
                linker.cluster(&store, bias.bias(), &rng)?
            };
            smh::save(&models, &output)
        }
        Commands::Cutoff { input, output, min_size, max_size } => {
            let mut store = smh::load(&input)?;
            let removed = store.cutoff(min_size, max_size);
            info!("Removed {removed} rows, {} left", store.size());
            smh::save(&store, &output)
        }
        Commands::Invert { input, output } => {
            let store = smh::load(&input)?;
            smh::save(&store.invert(), &output)
        }
        Commands::Search { index, queries, output, hashing, bias } => {
            let store = smh::load(&index)?;
            let queries = smh::load(&queries)?;
            let bias = LoadedBias::load(&bias)?;
            let search = if parallel {
                search_par(&store, hashing.miner_params(), bias.bias(), &rng)?
            } else {
                SearchIndex::build(&store, hashing.miner_params(), bias.bias(), &rng)?
            };
            smh::save(&search.query_multi(&queries)?, &output)
        }
    }
}

#[cfg(feature = "parallel")]
fn mine_par(miner: &Miner, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
    miner.mine_par(store, bias, rng)
}

#[cfg(not(feature = "parallel"))]
fn mine_par(miner: &Miner, store: &Store, bias: SamplingBias<'_>, rng: &MhRng) -> Result<Store> {
    miner.mine(store, bias, rng)
}

#[cfg(feature = "parallel")]
fn prune_par(pruner: &Pruner, candidates: &mut Store, index: &Store) -> Result<usize> {
    pruner.prune_par(candidates, index)
}

#[cfg(not(feature = "parallel"))]
fn prune_par(pruner: &Pruner, candidates: &mut Store, index: &Store) -> Result<usize> {
    pruner.prune(candidates, index)
}

#[cfg(feature = "parallel")]
fn cluster_par(
    linker: &Linker,
    store: &Store,
    bias: SamplingBias<'_>,
    rng: &MhRng,
) -> Result<Store> {
    linker.cluster_par(store, bias, rng)
}

#[cfg(not(feature = "parallel"))]
fn cluster_par(
    linker: &Linker,
    store: &Store,
    bias: SamplingBias<'_>,
    rng: &MhRng,
) -> Result<Store> {
    linker.cluster(store, bias, rng)
}

#[cfg(feature = "parallel")]
fn search_par<'a>(
    store: &'a Store,
    params: MinerParams,
    bias: SamplingBias<'_>,
    rng: &MhRng,
) -> Result<SearchIndex<'a>> {
    SearchIndex::build_par(store, params, bias, rng)
}

#[cfg(not(feature = "parallel"))]
fn search_par<'a>(
    store: &'a Store,
    params: MinerParams,
    bias: SamplingBias<'_>,
    rng: &MhRng,
) -> Result<SearchIndex<'a>> {
    SearchIndex::build(store, params, bias, rng)
}
