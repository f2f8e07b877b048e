mod config;
mod map_draw;
mod state;
mod ui;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEvent, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::{
    fs::{self, File},
    io::{self, Write},
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::{COUNTRY_HEIGHT, COUNTRY_WIDTH, Command, Config};
use country_atlas::{
    iso::{Alpha2, IsoTable},
    locate::find_country,
    resource::{FsFetcher, TopologyCache},
    svg,
    topology::decode_countries,
    viewport::Viewport,
    views::{CountryOutline, WorldMap, world_canvas},
};
use state::AppState;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

fn main() -> Result<()> {
    let config = Config::parse();

    match config.command {
        Some(Command::Svg {
            ref country,
            ref highlight,
            width,
            height,
            ref out,
        }) => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(io::stderr)
                .init();
            let target = match country {
                Some(raw) => Target::Country(raw.parse::<Alpha2>()?),
                None => Target::World(highlight.as_deref().map(str::parse::<Alpha2>).transpose()?),
            };
            export_svg(&config, target, width, height, out.clone())
        }
        None => {
            // terminal należy do TUI, logi idą do pliku
            let log = File::create(&config.log_file)
                .with_context(|| format!("cannot create log file {}", config.log_file.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(env_filter())
                .with_writer(Mutex::new(log))
                .with_ansi(false)
                .init();
            run_tui(&config)
        }
    }
}

/// Tablica z pliku `--iso-table` albo wbudowana.
fn iso_table(config: &Config) -> Result<IsoTable> {
    let Some(path) = &config.iso_table else {
        return Ok(IsoTable::builtin().clone());
    };
    let bytes = fs::read(path).with_context(|| format!("cannot read ISO table {}", path.display()))?;
    let table = IsoTable::from_json(&bytes).with_context(|| format!("invalid ISO table {}", path.display()))?;
    info!(path = %path.display(), entries = table.len(), "ISO table loaded");
    Ok(table)
}

fn run_tui(config: &Config) -> Result<()> {
    let mut state = AppState::new(&config.data_dir, &config.topology, iso_table(config)?);
    if let Some(code) = &config.country {
        state.open_country(code);
    }

    enable_raw_mode().context("cannot enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = event_loop(&mut terminal, &mut state);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;
    result
}

fn event_loop(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, state: &mut AppState) -> Result<()> {
    loop {
        state.tick();
        terminal.draw(|f| ui::draw(f, state))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(KeyEvent {
                    code,
                    kind: KeyEventKind::Press,
                    ..
                }) => {
                    if state.handle_key(code) {
                        info!("quit requested");
                        return Ok(());
                    }
                }
                Event::Mouse(mouse) => state.handle_mouse(mouse),
                _ => {}
            }
        }
    }
}

/// Co eksportujemy: jeden kraj albo świat z opcjonalnym wyróżnieniem.
enum Target {
    Country(Alpha2),
    World(Option<Alpha2>),
}

fn export_svg(
    config: &Config,
    target: Target,
    width: Option<f64>,
    height: Option<f64>,
    out: Option<PathBuf>,
) -> Result<()> {
    let table = iso_table(config)?;
    let mut cache = TopologyCache::new(Arc::new(FsFetcher::new(&config.data_dir)));
    let topology = cache
        .load_blocking(&config.topology)
        .with_context(|| format!("cannot load topology {}", config.topology))?;
    debug!(
        objects = ?topology.object_names().collect::<Vec<_>>(),
        arcs = topology.arc_count(),
        "topology loaded"
    );
    let collection = decode_countries(&topology)?;

    let (document, projection) = match target {
        Target::Country(code) => {
            let feature = find_country(&collection, code, &table)
                .ok_or_else(|| anyhow!("no shape for code {code}"))?;
            let size = Viewport::new(width.unwrap_or(COUNTRY_WIDTH), height.unwrap_or(COUNTRY_HEIGHT));
            let outline = CountryOutline::fit(code, feature, size)
                .with_context(|| format!("no projection available for {code}"))?;
            (svg::render_country_svg(&outline), outline.projection)
        }
        Target::World(highlight) => {
            let canvas = world_canvas();
            let size = Viewport::new(width.unwrap_or(canvas.width()), height.unwrap_or(canvas.height()));
            let map = WorldMap::build(&collection, &table, size).context("no projection available for the world map")?;
            if let Some(code) = highlight.filter(|code| !map.regions().iter().any(|r| r.code == *code)) {
                warn!(%code, "highlighted country is not on the map");
            }
            (svg::render_world_svg(&map, highlight), *map.projection())
        }
    };
    info!(
        scale = projection.scale(),
        center = ?projection.center(),
        translate = ?projection.translate(),
        "projection fitted"
    );

    if let Some(path) = out {
        fs::write(&path, &document).with_context(|| format!("cannot write {}", path.display()))?;
        info!(path = %path.display(), bytes = document.len(), "svg written");
    } else {
        io::stdout().write_all(document.as_bytes())?;
    }
    Ok(())
}
