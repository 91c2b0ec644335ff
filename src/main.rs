use clap::{Args, Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use wavegraph::{AlignError, Aligner, MsaAligner, Penalties};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,

    #[command(flatten)]
    costs: Costs,
}

#[derive(Args)]
struct Costs {
    #[arg(long, default_value_t = 0)]
    match_cost: i32,
    #[arg(long, default_value_t = 2)]
    mismatch_cost: i32,
    #[arg(long, default_value_t = 3)]
    gap_open: i32,
    #[arg(long, default_value_t = 1)]
    gap_extend: i32,
}

#[derive(Subcommand)]
enum Cmd {
    /// Align a single query against a GFA graph.
    Align {
        /// Reference graph in GFA format.
        gfa: PathBuf,
        /// Query sequence.
        query: String,
        /// Node to start in.
        #[arg(long)]
        start: String,
        /// Label offset inside the start node.
        #[arg(long, default_value_t = 0)]
        offset: i32,
        /// Emit the alignment as JSON instead of text.
        #[arg(long)]
        json: bool,
    },
    /// Build a partial-order MSA from the sequences of a FASTA file.
    Msa {
        /// Sequences to align, first one seeds the graph.
        fasta: PathBuf,
        /// Write the final graph as GFA.
        #[arg(long)]
        gfa_out: Option<PathBuf>,
        /// Write the column-aligned sequences as FASTA.
        #[arg(long)]
        msa_out: Option<PathBuf>,
        /// Write the final graph as Graphviz dot.
        #[arg(long)]
        dot_out: Option<PathBuf>,
        /// Print the consensus sequence.
        #[arg(long)]
        consensus: bool,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        eprintln!("error: {err}");
        std::process::exit(exit_code(&err));
    }
}

fn exit_code(err: &AlignError) -> i32 {
    match err {
        AlignError::InvalidPenalties(_) | AlignError::BadStart(_) | AlignError::EmptyInput(_) => 2,
        AlignError::MalformedGfa { .. } | AlignError::UnsupportedGraph(_) => 3,
        AlignError::NoAlignment { .. } => 4,
        AlignError::InternalInvariant(_) => 5,
        _ => 1,
    }
}

fn run(cli: Cli) -> wavegraph::Result<()> {
    let penalties = Penalties::new(
        cli.costs.match_cost,
        cli.costs.mismatch_cost,
        cli.costs.gap_open,
        cli.costs.gap_extend,
    )?;
    match cli.cmd {
        Cmd::Align {
            gfa,
            query,
            start,
            offset,
            json,
        } => {
            let aligner = Aligner::from_gfa(penalties, BufReader::new(File::open(gfa)?))?;
            let alignment = aligner.align(query.as_bytes(), &start, offset)?;
            let stdout = io::stdout();
            let mut out = stdout.lock();
            if json {
                let text = serde_json::to_string_pretty(&alignment).expect("serializable");
                writeln!(out, "{text}")?;
            } else {
                let path: Vec<String> = alignment
                    .path
                    .iter()
                    .map(|&id| aligner.graph().node(id).name.clone())
                    .collect();
                writeln!(out, "score\t{}", alignment.score)?;
                writeln!(out, "edits\t{}", alignment.edits)?;
                writeln!(out, "path\t{}", path.join(","))?;
            }
        }
        Cmd::Msa {
            fasta,
            gfa_out,
            msa_out,
            dot_out,
            consensus,
        } => {
            let reader = bio::io::fasta::Reader::new(BufReader::new(File::open(fasta)?));
            let mut msa: Option<MsaAligner> = None;
            for record in reader.records() {
                let record = record?;
                match msa.as_mut() {
                    None => msa = Some(MsaAligner::new(penalties, record.seq())?),
                    Some(msa) => {
                        let alignment = msa.align(record.seq())?;
                        eprintln!("{}\tscore {}", record.id(), alignment.score);
                    }
                }
            }
            let msa = msa.ok_or(AlignError::EmptyInput("no sequences in FASTA input"))?;
            if let Some(path) = gfa_out {
                msa.write_gfa(File::create(path)?)?;
            }
            if let Some(path) = msa_out {
                msa.write_msa_fasta(File::create(path)?)?;
            }
            if let Some(path) = dot_out {
                msa.write_dot(File::create(path)?)?;
            }
            if consensus {
                println!("{}", String::from_utf8_lossy(&msa.consensus()));
            }
        }
    }
    Ok(())
}
