use std::fs;
use std::fs::File;
use std::io;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use xargen::generate;
use xargen::FileNode;
use xargen::NoSigner;
use xargen::RsaSigner;
use xargen::SignatureResources;
use xargen::Signer;
use xargen::XarError;

/// Write a XAR archive containing the given files and directories.
///
/// Building the file tree from disk, and loading PEM key/certificate
/// material, are demonstration concerns that live here rather than in the
/// `xargen` library: the library only ever operates on an in-memory file
/// forest and PEM text the caller already has in hand.
#[derive(Parser)]
#[clap(arg_required_else_help = true, about = "Write signed XAR archives")]
struct Args {
    /// Create an archive (the only supported mode).
    #[arg(short = 'c')]
    create: bool,
    /// An archive.
    #[arg(short = 'f')]
    file_name: PathBuf,
    /// Sign with this PEM private key.
    #[arg(long)]
    sign: Option<PathBuf>,
    /// Embed this PEM certificate (required together with `--sign`).
    #[arg(long)]
    cert: Option<PathBuf>,
    /// Embed this additional PEM certificate after the leaf (repeatable).
    #[arg(long = "intermediate")]
    intermediates: Vec<PathBuf>,
    /// Files and directories to archive.
    #[arg(
        trailing_var_arg = true,
        allow_hyphen_values = true,
        value_name = "PATH"
    )]
    paths: Vec<PathBuf>,
}

fn main() -> ExitCode {
    match do_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn do_main() -> Result<(), io::Error> {
    let args = Args::parse();
    if !args.create {
        return Err(io::Error::other("only archive creation (-c) is supported"));
    }

    let roots = args
        .paths
        .iter()
        .map(|path| walk_path(path))
        .collect::<Result<Vec<_>, _>>()?;

    let signer: Box<dyn Signer> = match (&args.sign, &args.cert) {
        (Some(key_path), Some(cert_path)) => {
            let resources = SignatureResources {
                certificate_pem: fs::read_to_string(cert_path)?,
                private_key_pem: fs::read_to_string(key_path)?,
                additional_certificates_pem: args
                    .intermediates
                    .iter()
                    .map(fs::read_to_string)
                    .collect::<Result<Vec<_>, _>>()?,
            };
            Box::new(RsaSigner::new(&resources).map_err(io::Error::from)?)
        }
        (None, None) => Box::new(NoSigner),
        _ => return Err(io::Error::other("--sign and --cert must be given together")),
    };

    let file = File::create(&args.file_name)?;
    generate(file, roots, signer.as_ref(), |path| {
        fs::read(path).map_err(XarError::from)
    })
    .map_err(io::Error::from)?;
    Ok(())
}

fn walk_path(path: &Path) -> Result<FileNode, io::Error> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());
    let metadata = fs::metadata(path)?;
    if metadata.is_dir() {
        let mut entries = fs::read_dir(path)?.collect::<Result<Vec<_>, _>>()?;
        entries.sort_by_key(fs::DirEntry::file_name);
        let children = entries
            .iter()
            .map(|entry| walk_path(&entry.path()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(FileNode::directory(name, path, children))
    } else {
        Ok(FileNode::file(name, path, metadata.len()))
    }
}
