mod pigeonhole;
mod result;

use std::fs::File;
use std::io::BufReader;
use std::io::BufWriter;
use std::io::Read;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use log::debug;
use log::error;
use log::info;
use log::LevelFilter;
use pbip_format::cnf::CnfDocument;
use pbip_format::cnf::CnfOptions;
use pbip_format::derivation::Replay;
use pbip_format::reader::ProofReader;
use pbip_format::varint;
use pbip_format::writer::ProofWriter;
use pbip_format::Format;
use result::PbipError;
use result::PbipResult;

#[derive(Debug, Parser)]
#[command(
    help_template = "\
{before-help}{name} {version}
Authors: {author}
About: {about}

{usage-heading}\n{tab}{usage}

{all-args}{after-help}
",
    author,
    version,
    about,
    arg_required_else_help = true
)]
struct Args {
    /// Log additional information about what is read, derived and written.
    #[arg(short = 'v', long = "verbose", global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate a DIMACS CNF file.
    ///
    /// Prints 's VALID <variables> <clauses>' if the file is well-formed.
    CheckCnf {
        /// The '*.cnf' file to validate.
        instance_path: PathBuf,

        /// Accept clause lines that are not terminated with a '0'.
        #[arg(long)]
        lenient: bool,
    },

    /// Derive the refutation of a pigeonhole instance by summing its constraints.
    ///
    /// Pigeon j in hole i is variable (j - 1) * holes + i.
    #[command(verbatim_doc_comment)]
    Pigeonhole {
        /// The number of holes.
        #[arg(long)]
        holes: u32,

        /// The number of pigeons.
        #[arg(long)]
        pigeons: u32,

        /// The output path for the proof trace. If absent, only statistics are reported.
        ///
        /// If the file extension ends with `.gz`, a gzipped proof will be produced.
        #[arg(long)]
        proof_path: Option<PathBuf>,

        /// The encoding of the proof trace.
        #[arg(long, value_enum, default_value_t)]
        format: ProofFormat,
    },

    /// Replay a proof trace and check that it ends in a contradiction.
    ///
    /// Every assert step must be the sum of the two steps it names as hints.
    Verify {
        /// The proof trace. If the path ends in `.gz`, it is unzipped on-the-fly.
        proof_path: PathBuf,

        /// The encoding of the proof trace.
        #[arg(long, value_enum, default_value_t)]
        format: ProofFormat,
    },

    /// Read whitespace-separated integers from stdin and write them as varints to stdout.
    Encode,

    /// Read varints from stdin and write them as whitespace-separated integers to stdout.
    Decode,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
enum ProofFormat {
    /// Line-based text.
    #[default]
    Text,
    /// Varint-encoded records.
    Binary,
}

impl From<ProofFormat> for Format {
    fn from(value: ProofFormat) -> Self {
        match value {
            ProofFormat::Text => Format::Text,
            ProofFormat::Binary => Format::Binary,
        }
    }
}

fn configure_logging(verbose: bool) {
    let level_filter = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };

    env_logger::Builder::new()
        .format(move |buf, record| {
            write!(buf, "c ")?;

            writeln!(buf, "{}", record.args())
        })
        .filter_level(level_filter)
        .target(env_logger::Target::Stderr)
        .init();
    info!("Logging successfully configured");
}

fn main() {
    let args = Args::parse();
    configure_logging(args.verbose);

    match run(args.command) {
        Ok(()) => {}
        Err(e) => {
            error!("Execution failed, error: {e}");
            std::process::exit(1);
        }
    }
}

fn run(command: Command) -> PbipResult<()> {
    match command {
        Command::CheckCnf {
            instance_path,
            lenient,
        } => check_cnf(&instance_path, lenient),

        Command::Pigeonhole {
            holes,
            pigeons,
            proof_path,
            format,
        } => run_pigeonhole(holes, pigeons, proof_path.as_deref(), format.into()),

        Command::Verify { proof_path, format } => verify(&proof_path, format.into()),

        Command::Encode => encode(),

        Command::Decode => decode(),
    }
}

fn check_cnf(instance_path: &Path, lenient: bool) -> PbipResult<()> {
    let options = if lenient {
        CnfOptions::lenient()
    } else {
        CnfOptions::default()
    };

    let file = File::open(instance_path)?;
    let document = CnfDocument::parse_with_comments(file, options, |comment| {
        debug!("comment: {comment}");
    })?;

    println!(
        "s VALID {} {}",
        document.num_variables(),
        document.declared_clause_count()
    );

    Ok(())
}

fn run_pigeonhole(
    holes: u32,
    pigeons: u32,
    proof_path: Option<&Path>,
    format: Format,
) -> PbipResult<()> {
    let refutation = match proof_path {
        Some(path) => {
            let (refutation, sink) =
                pigeonhole::refute(holes, pigeons, create_proof_writer(path, format)?)?;
            sink.finish()?;
            refutation
        }
        None => pigeonhole::refute(holes, pigeons, ProofWriter::null())?.0,
    };

    let statistics = refutation.statistics;
    info!(
        "inputs={} asserts={} comments={}",
        statistics.inputs, statistics.asserts, statistics.comments
    );
    println!(
        "c step {} derives {}",
        refutation.last_step, refutation.constraint
    );

    if !refutation.constraint.is_contradiction() {
        return Err(PbipError::NoContradiction);
    }

    println!("s UNSATISFIABLE");
    Ok(())
}

fn verify(proof_path: &Path, format: Format) -> PbipResult<()> {
    let mut reader = create_proof_reader(proof_path, format)?;
    let mut replay = Replay::default();

    while let Some(step) = reader.next_step()? {
        replay.check_step(step)?;
    }

    let (inputs, asserts) = replay.counts();
    info!("checked {inputs} inputs and {asserts} asserts");

    if !replay.concludes_contradiction() {
        return Err(PbipError::NoContradiction);
    }

    println!("s VERIFIED");
    Ok(())
}

fn encode() -> PbipResult<()> {
    let mut input = String::new();
    let _ = std::io::stdin().read_to_string(&mut input)?;

    let values = input
        .split_whitespace()
        .map(|word| {
            word.parse::<i64>()
                .map_err(|_| PbipError::InvalidInteger(word.to_owned()))
        })
        .collect::<PbipResult<Vec<_>>>()?;

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(&varint::encode(&values))?;
    stdout.flush()?;

    Ok(())
}

fn decode() -> PbipResult<()> {
    let mut input = Vec::new();
    let _ = std::io::stdin().read_to_end(&mut input)?;

    let values = varint::decode(&input)?;

    let mut stdout = BufWriter::new(std::io::stdout().lock());
    for (index, value) in values.iter().enumerate() {
        if index > 0 {
            write!(stdout, " ")?;
        }
        write!(stdout, "{value}")?;
    }
    writeln!(stdout)?;
    stdout.flush()?;

    Ok(())
}

fn is_gzipped(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "gz")
}

fn create_proof_reader(path: &Path, format: Format) -> PbipResult<ProofReader<Box<dyn Read>>> {
    let file = File::open(path)?;

    if is_gzipped(path) {
        #[cfg(feature = "gzipped-proofs")]
        {
            let decoder = flate2::read::GzDecoder::new(file);
            Ok(ProofReader::new(format, Box::new(decoder)))
        }

        #[cfg(not(feature = "gzipped-proofs"))]
        {
            Err(PbipError::GzipNotSupported(path.display().to_string()))
        }
    } else {
        Ok(ProofReader::new(format, Box::new(BufReader::new(file))))
    }
}

fn create_proof_writer(path: &Path, format: Format) -> PbipResult<ProofWriter<ProofSink<File>>> {
    if is_gzipped(path) {
        #[cfg(feature = "gzipped-proofs")]
        {
            let file = File::create(path)?;
            let encoder = flate2::write::GzEncoder::new(file, flate2::Compression::fast());
            Ok(ProofWriter::new(format, ProofSink::Gzipped(encoder)))
        }

        #[cfg(not(feature = "gzipped-proofs"))]
        {
            Err(PbipError::GzipNotSupported(path.display().to_string()))
        }
    } else {
        Ok(ProofWriter::new(format, ProofSink::Plain(File::create(path)?)))
    }
}

/// The destination of a proof trace, possibly compressed.
#[derive(Debug)]
enum ProofSink<W: Write> {
    Plain(W),
    #[cfg(feature = "gzipped-proofs")]
    Gzipped(flate2::write::GzEncoder<W>),
}

impl<W: Write> ProofSink<W> {
    /// Write the trailer of the encoding, if any, and flush the file.
    fn finish(self) -> std::io::Result<()> {
        match self {
            ProofSink::Plain(mut sink) => sink.flush(),
            #[cfg(feature = "gzipped-proofs")]
            ProofSink::Gzipped(encoder) => encoder.finish()?.flush(),
        }
    }
}

impl<W: Write> Write for ProofSink<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        match self {
            ProofSink::Plain(sink) => sink.write(buf),
            #[cfg(feature = "gzipped-proofs")]
            ProofSink::Gzipped(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match self {
            ProofSink::Plain(sink) => sink.flush(),
            #[cfg(feature = "gzipped-proofs")]
            ProofSink::Gzipped(encoder) => encoder.flush(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_sink_holds_the_trace() {
        let writer = ProofWriter::new(Format::Text, ProofSink::Plain(Vec::new()));
        let (_, sink) = pigeonhole::refute(2, 3, writer).unwrap();

        let ProofSink::Plain(trace) = sink else {
            panic!("expected a plain sink");
        };
        let trace = String::from_utf8(trace).unwrap();
        assert_eq!(Some("a >= 1 ; 7 8"), trace.lines().last());
    }

    #[test]
    #[cfg(feature = "gzipped-proofs")]
    fn gzipped_sink_is_complete_after_finish() {
        let path = std::env::temp_dir().join(format!("pbip-{}-sink.pbip.gz", std::process::id()));
        let writer = create_proof_writer(&path, Format::Text).unwrap();
        let (_, sink) = pigeonhole::refute(2, 3, writer).unwrap();
        sink.finish().unwrap();

        let mut trace = String::new();
        let _ = flate2::read::GzDecoder::new(File::open(&path).unwrap())
            .read_to_string(&mut trace)
            .unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(Some("a >= 1 ; 7 8"), trace.lines().last());
    }

    #[test]
    #[cfg(feature = "gzipped-proofs")]
    fn failing_gzip_trailer_is_reported() {
        let encoder = flate2::write::GzEncoder::new(
            BreakableSink::default(),
            flate2::Compression::fast(),
        );
        let writer = ProofWriter::new(Format::Text, ProofSink::Gzipped(encoder));
        let (_, mut sink) = pigeonhole::refute(2, 3, writer).unwrap();

        let ProofSink::Gzipped(encoder) = &mut sink else {
            panic!("expected a gzipped sink");
        };
        encoder.get_mut().is_broken = true;

        assert!(sink.finish().is_err());
    }

    /// Accepts writes until it is broken.
    #[derive(Debug, Default)]
    struct BreakableSink {
        is_broken: bool,
        bytes: Vec<u8>,
    }

    impl Write for BreakableSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.is_broken {
                return Err(std::io::Error::other("the disk is full"));
            }

            self.bytes.write(buf)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
