use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr, eyre};

use mappa_data::xml::XmlSections;
use mappa_edit::{DungeonEditor, DungeonListEntry};
use mappa_gen::{FloorGrid, TileType};

mod project;

use project::{JsonPatches, JsonProject};

#[derive(Parser)]
#[command(author, version, about = "Dungeon data editing toolkit", long_about = None)]
struct Cli {
    /// Project directory holding the extracted data blobs
    #[arg(short, long, default_value = "project")]
    project: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the grouped dungeon list
    List,
    /// Validate the dungeon model and print findings
    Validate {
        /// Apply automatic repairs and write the result back
        #[arg(long)]
        repair: bool,
    },
    /// Render an ASCII preview of a generated floor
    Preview {
        dungeon: u8,
        floor: u8,
        /// Generator seed; defaults to the project settings, then 0
        #[arg(short, long)]
        seed: Option<u32>,
    },
    /// Export a floor as XML to stdout or a file
    Export {
        dungeon: u8,
        floor: u8,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import floor XML, replacing all sections of the target floor
    Import {
        dungeon: u8,
        floor: u8,
        input: PathBuf,
    },
}

/// Optional per-project settings, read from `mappa.toml` next to the data.
struct Settings {
    default_seed: u32,
}

impl Settings {
    fn load(project_dir: &std::path::Path) -> Self {
        let file = project_dir.join("mappa.toml");
        let default_seed = config::Config::builder()
            .add_source(config::File::from(file).required(false))
            .build()
            .ok()
            .and_then(|settings| settings.get::<u32>("preview.seed").ok())
            .unwrap_or(0);
        Self { default_seed }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;
    env_logger::init();

    let cli = Cli::parse();
    let settings = Settings::load(&cli.project);
    let storage = JsonProject::open(&cli.project);
    let patches = JsonPatches::open(&cli.project);
    let mut editor = DungeonEditor::open(storage, patches)
        .wrap_err_with(|| format!("opening project {}", cli.project.display()))?;

    match cli.command {
        Command::List => {
            for entry in editor.load_dungeons() {
                match entry {
                    DungeonListEntry::Single(id) => {
                        let def = editor.dungeons()[usize::from(id)];
                        println!("dungeon {id}: {} floors", def.number_floors);
                    }
                    DungeonListEntry::Group(group) => {
                        println!("group (base {}):", group.base_id);
                        for (&member, &start) in group.members.iter().zip(&group.start_ids) {
                            let def = editor.dungeons()[usize::from(member)];
                            println!(
                                "  dungeon {member}: {} floors from position {start}",
                                def.number_floors
                            );
                        }
                    }
                }
            }
        }
        Command::Validate { repair } => {
            let errors = editor.validate();
            if errors.is_empty() {
                println!("model is valid");
                return Ok(());
            }
            for error in &errors {
                println!("{error}");
            }
            if repair {
                let applied = editor.repair_all();
                println!("applied {applied} repairs");
                let remaining = editor.validate();
                if !remaining.is_empty() {
                    return Err(eyre!("{} findings could not be repaired", remaining.len()));
                }
                editor.save().wrap_err("writing repaired model")?;
            } else {
                return Err(eyre!("{} validation findings", errors.len()));
            }
        }
        Command::Preview {
            dungeon,
            floor,
            seed,
        } => {
            let seed = seed.unwrap_or(settings.default_seed);
            let grid = editor
                .generate_preview(dungeon, floor, seed)?
                .ok_or_else(|| eyre!("floor could not be generated; check its layout"))?;
            print!("{}", render(&grid));
            for warning in &grid.warnings {
                log::warn!("{warning:?}");
            }
        }
        Command::Export {
            dungeon,
            floor,
            output,
        } => {
            let document = editor.export_floor_to_xml(dungeon, floor, XmlSections::all())?;
            match output {
                Some(path) => fs::write(&path, document)
                    .wrap_err_with(|| format!("writing {}", path.display()))?,
                None => print!("{document}"),
            }
        }
        Command::Import {
            dungeon,
            floor,
            input,
        } => {
            let document = fs::read_to_string(&input)
                .wrap_err_with(|| format!("reading {}", input.display()))?;
            editor.import_from_xml(dungeon, floor, &document, XmlSections::all())?;
            editor.save().wrap_err("writing imported floor")?;
            println!("imported into dungeon {dungeon} floor {floor}");
        }
    }
    Ok(())
}

fn render(grid: &FloorGrid) -> String {
    let mut out = String::with_capacity((grid.width() + 1) * grid.height());
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            out.push(match grid.get(x, y).tile_type {
                TileType::Wall => '#',
                TileType::Floor => '.',
                TileType::Water => '~',
                TileType::PlayerSpawn => '@',
                TileType::Enemy => 'e',
                TileType::Item => 'i',
                TileType::BuriedItem => 'b',
                TileType::Trap => '^',
                TileType::Stairs => '>',
            });
        }
        out.push('\n');
    }
    out
}
