//! bead - inspect, store and develop bead archives

use anyhow::{bail, Context};
use bead::{
    Archive, BeadBox, BeadReference, BoxRegistry, Config, FreezeTime, MetaBead, VersionResolver,
    Workspace,
};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "bead")]
#[command(about = "Content-addressed archives of code and data")]
struct Args {
    /// Box configuration file [default: $BEAD_CONFIG or ~/.config/bead/boxes.toml]
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage boxes
    #[command(subcommand)]
    Box(BoxCommand),

    /// Verify an archive against its manifest
    Validate { archive: PathBuf },

    /// List the beads in all boxes, or in one
    List {
        #[arg(short, long = "box")]
        box_name: Option<String>,
    },

    /// Show every version of a bead, most recent first
    Versions { name: String },

    /// Resolve a reference like `name`, `name@-1` or `name@TIMESTAMP`
    Resolve {
        reference: String,

        #[arg(short, long = "box")]
        box_name: Option<String>,
    },

    /// Freeze a workspace into a box
    Save {
        /// Workspace directory
        #[arg(default_value = ".")]
        workspace: PathBuf,

        #[arg(short, long = "box")]
        box_name: Option<String>,
    },

    /// Unpack a bead into a new workspace
    Develop {
        reference: String,
        directory: PathBuf,

        /// Also extract the data files into output/
        #[arg(short = 'x', long)]
        extract_output: bool,
    },
}

#[derive(Subcommand, Debug)]
enum BoxCommand {
    /// Register a directory as a box
    Add { name: String, directory: PathBuf },
    /// Show configured boxes
    List,
    /// Unregister a box (its archives are kept)
    Forget { name: String },
}

fn config_path(args: &Args) -> anyhow::Result<PathBuf> {
    match &args.config {
        Some(path) => Ok(path.clone()),
        None => Config::default_path().context("cannot locate the config file, set BEAD_CONFIG"),
    }
}

fn load_registry(path: &Path) -> anyhow::Result<BoxRegistry> {
    let config = Config::load(path).with_context(|| format!("loading {:?}", path))?;
    Ok(config.registry())
}

fn resolver<'a>(
    registry: &'a BoxRegistry,
    box_name: Option<&str>,
) -> anyhow::Result<VersionResolver<'a>> {
    Ok(match box_name {
        Some(name) => VersionResolver::single(registry.require(name)?),
        None => VersionResolver::from_registry(registry),
    })
}

fn print_version(bead: &MetaBead) {
    match bead {
        MetaBead::Real(bead) => println!(
            "{}  {}  {:<12}  {}",
            bead.freeze_time,
            bead.name,
            bead.box_name,
            &bead.content_id[..bead.content_id.len().min(16)]
        ),
        MetaBead::Phantom(phantom) => {
            println!("{}  {}  ({})", phantom.freeze_time, phantom.name, phantom.kind)
        }
    }
}

fn run_box(command: BoxCommand, path: PathBuf) -> anyhow::Result<()> {
    let mut config = Config::load(&path)?;
    match command {
        BoxCommand::Add { name, directory } => {
            config.add_box(&name, &directory)?;
            config.save(&path)?;
            println!("Box '{}' added", name);
        }
        BoxCommand::List => {
            for b in &config.boxes {
                println!("{:<12} {}", b.name, b.directory.display());
            }
        }
        BoxCommand::Forget { name } => {
            if !config.forget_box(&name) {
                bail!("unknown box '{}'", name);
            }
            config.save(&path)?;
            println!("Box '{}' forgotten", name);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let path = config_path(&args);

    match args.command {
        Command::Box(command) => run_box(command, path?)?,

        Command::Validate { archive } => {
            let archive = Archive::open(&archive)?;
            archive.validate()?;
            println!("{} is valid ({})", archive.path().display(), archive.content_id()?);
        }

        Command::List { box_name } => {
            let registry = load_registry(&path?)?;
            let boxes: Vec<&dyn BeadBox> = match &box_name {
                Some(name) => vec![registry.require(name)?],
                None => registry.iter().collect(),
            };
            for bead_box in boxes {
                for bead in bead_box.list() {
                    print_version(&MetaBead::Real(bead));
                }
            }
        }

        Command::Versions { name } => {
            let registry = load_registry(&path?)?;
            let versions = VersionResolver::from_registry(&registry).versions(&name);
            if versions.is_empty() {
                bail!("no versions of '{}' in any box", name);
            }
            versions.iter().for_each(print_version);
        }

        Command::Resolve {
            reference,
            box_name,
        } => {
            let registry = load_registry(&path?)?;
            let reference = BeadReference::parse(&reference)?;
            let bead = resolver(&registry, box_name.as_deref())?.resolve_real(&reference)?;
            print_version(&MetaBead::Real(bead));
        }

        Command::Save {
            workspace,
            box_name,
        } => {
            let workspace = Workspace::new(&workspace);
            if !workspace.is_valid() {
                bail!("{:?} is not a workspace", workspace.directory());
            }
            let registry = load_registry(&path?)?;
            let bead_box = match &box_name {
                Some(name) => registry.require(name)?,
                None => registry
                    .only_box()
                    .context("more than one box (or none) is configured, pick one with --box")?,
            };
            let archive = bead_box.store(&workspace, &FreezeTime::now())?;
            info!("Saved {:?}", archive.path());
            println!("{}", archive.path().display());
        }

        Command::Develop {
            reference,
            directory,
            extract_output,
        } => {
            if directory.exists() {
                bail!("{:?} already exists", directory);
            }
            let registry = load_registry(&path?)?;
            let resolver = VersionResolver::from_registry(&registry);
            let bead = resolver.resolve_real(&BeadReference::parse(&reference)?)?;
            let archive = resolver.archive(&bead)?;
            archive.validate()?;

            let workspace = Workspace::new(&directory);
            archive.unpack_to(&workspace)?;
            if extract_output {
                archive.unpack_data_to(directory.join("output"))?;
            }
            println!("Extracted {} into {}", bead.name, directory.display());
        }
    }
    Ok(())
}
