//! mermaidview - interactive HTML previews and thumbnails for Mermaid diagrams.
//!
//! # Usage
//!
//! ```bash
//! mermaidview preview flow.mmd -o flow.html
//! mermaidview --theme forest editor README.md -o editor.html
//! mermaidview thumbnail flow.mmd -o flow.png --size 256
//! mermaidview watch flow.mmd -o live.html
//! mermaidview settings set ql.sizing expandVertical
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};

use mermaidview::assets::{AssetBundle, resolve_assets_dir};
use mermaidview::config::{RenderOverrides, settings_path};
use mermaidview::error::PreviewError;
use mermaidview::html::{MermaidRenderer, RenderState};
use mermaidview::options::{
    BackgroundMode, DarkModeSetting, HexColor, MouseMode, RenderOptions, Sizing, Theme,
};
use mermaidview::quicklook;
use mermaidview::settings::shortcuts::{KeyEvent, RecordOutcome};
use mermaidview::settings::{
    SettingKey, SettingsStore, ShortcutAction, ShortcutManager, StoredShortcut, apply_to_quicklook,
};
use mermaidview::surface::{LiveSurface, SurfaceCommand, settings_preview};
use mermaidview::watcher::{DEFAULT_DEBOUNCE, POLL_INTERVAL, SourceWatcher};

/// Interactive HTML previews and thumbnails for Mermaid diagrams
#[derive(Parser, Debug)]
#[command(name = "mermaidview", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file shared with the preview extensions
    #[arg(long, global = true, value_name = "PATH")]
    settings: Option<PathBuf>,

    /// Render as if the system appearance were dark
    #[arg(long, global = true, conflicts_with = "light")]
    dark: bool,

    /// Render as if the system appearance were light
    #[arg(long, global = true)]
    light: bool,

    /// Directory holding mermaid.min.js and icons/
    #[arg(long, global = true, value_name = "DIR")]
    assets: Option<PathBuf>,

    /// Log at debug level (RUST_LOG still applies)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(flatten)]
    render: RenderArgs,
}

/// Per-run overrides of the stored render settings.
#[derive(Args, Debug, Default)]
struct RenderArgs {
    /// Diagram theme
    #[arg(long, global = true, value_enum)]
    theme: Option<Theme>,

    /// Dark mode setting
    #[arg(long, global = true, value_enum)]
    dark_mode: Option<DarkModeSetting>,

    /// How the diagram is sized in the window
    #[arg(long, global = true, value_enum)]
    sizing: Option<Sizing>,

    /// Page background
    #[arg(long, global = true, value_enum)]
    background: Option<BackgroundMode>,

    /// Opaque background colour (implies --background opaque)
    #[arg(long, global = true, value_name = "#RRGGBB")]
    bg_color: Option<HexColor>,

    /// Initial mouse mode
    #[arg(long, global = true, value_enum)]
    mouse_mode: Option<MouseMode>,

    /// Leave out the toolbar and interaction layer
    #[arg(long, global = true)]
    no_toolbar: bool,

    /// Show the debug overlay
    #[arg(long, global = true)]
    debug: bool,
}

impl RenderArgs {
    fn overrides(&self) -> RenderOverrides {
        RenderOverrides {
            theme: self.theme,
            dark_mode: self.dark_mode,
            sizing: self.sizing,
            background_mode: self.background,
            background_color: self.bg_color.clone(),
            mouse_mode: self.mouse_mode,
            hide_toolbar: self.no_toolbar,
            show_debug: self.debug,
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Write the interactive preview page for a diagram or markdown file
    Preview {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// Write the live editor page
    Editor {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
        /// Initial zoom factor
        #[arg(long, default_value_t = 1.0)]
        zoom: f64,
    },
    /// Write the settings panel preview of the sample diagram
    Sample {
        #[arg(short, long, value_name = "OUT")]
        output: Option<PathBuf>,
    },
    /// Draw the placeholder thumbnail (.png or .svg by output extension)
    Thumbnail {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,
        /// Edge length in pixels
        #[arg(long, default_value_t = 256)]
        size: u32,
    },
    /// Write the editor page, then print an update command on every change
    Watch {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        #[arg(short, long, value_name = "OUT")]
        output: PathBuf,
    },
    /// Read and change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
    /// Read and change keyboard shortcuts
    Shortcuts {
        #[command(subcommand)]
        action: ShortcutsCommand,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    /// Print one setting
    Get { key: SettingKey },
    /// Store a setting
    Set { key: SettingKey, value: String },
    /// Print every setting; unset ones are marked as defaults
    List,
    /// Remove one setting, or all of them
    Reset { key: Option<SettingKey> },
    /// Reset the system preview cache so new settings show up
    Apply,
}

#[derive(Subcommand, Debug)]
enum ShortcutsCommand {
    /// Print every binding
    List,
    /// Bind an action, e.g. `toggleEditor cmd+shift+e`
    Set {
        action: ShortcutAction,
        binding: StoredShortcut,
    },
    /// Restore one action's default, or all of them
    Reset { action: Option<ShortcutAction> },
}

// Best effort: only macOS exposes the appearance to a command-line process.
fn detect_system_dark() -> bool {
    if !cfg!(target_os = "macos") {
        return false;
    }
    Command::new("defaults")
        .args(["read", "-g", "AppleInterfaceStyle"])
        .output()
        .is_ok_and(|out| String::from_utf8_lossy(&out.stdout).trim() == "Dark")
}

fn write_output(path: Option<&Path>, bytes: &[u8]) -> Result<()> {
    match path {
        Some(path) => {
            std::fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), bytes = bytes.len(), "wrote output");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(bytes).context("Failed to write to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}

struct Session {
    store: SettingsStore,
    renderer: Arc<MermaidRenderer>,
    overrides: RenderOverrides,
    system_is_dark: bool,
}

impl Session {
    fn from_cli(cli: &Cli) -> Self {
        let path = cli.settings.clone().unwrap_or_else(settings_path);
        tracing::debug!(path = %path.display(), "settings domain");
        let assets_dir = resolve_assets_dir(cli.assets.as_deref());
        let system_is_dark = if cli.dark {
            true
        } else if cli.light {
            false
        } else {
            detect_system_dark()
        };
        Self {
            store: SettingsStore::open(path),
            renderer: Arc::new(MermaidRenderer::new(&AssetBundle::load(&assets_dir))),
            overrides: cli.render.overrides(),
            system_is_dark,
        }
    }

    // Settings are read fresh on every call.
    fn options(&self) -> RenderOptions {
        self.overrides.applied_to(self.store.snapshot())
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Session::from_cli(&cli);
    match cli.command {
        Commands::Preview { file, output } => {
            let reply = quicklook::provide_preview(&file, &ctx.renderer, &ctx.options(), ctx.system_is_dark)?;
            write_output(output.as_deref(), reply.html.as_bytes())
        }
        Commands::Editor { file, output, zoom } => {
            let code = mermaidview::markdown::load_diagram_source(&file)?;
            let html = ctx
                .renderer
                .generate_editor_html(&code, &ctx.options(), ctx.system_is_dark, zoom)
                .context("Failed to build editor page")?;
            write_output(output.as_deref(), html.as_bytes())
        }
        Commands::Sample { output } => {
            let html = settings_preview(Arc::clone(&ctx.renderer))
                .render(&ctx.options(), ctx.system_is_dark)
                .context("Failed to build sample page")?;
            write_output(output.as_deref(), html.as_bytes())
        }
        Commands::Thumbnail { file, output, size } => thumbnail(&ctx, &file, &output, size),
        Commands::Watch { file, output } => watch(&ctx, file, &output),
        Commands::Settings { action } => settings(&ctx.store, action),
        Commands::Shortcuts { action } => shortcuts(ctx.store.clone(), action),
    }
}

fn thumbnail(ctx: &Session, file: &Path, output: &Path, size: u32) -> Result<()> {
    let Some(thumb) = quicklook::provide_thumbnail(file, size, size, &ctx.store)? else {
        eprintln!("Thumbnails are disabled (thumbnail.enabled = false)");
        return Ok(());
    };
    let is_svg = output
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("svg"));
    let bytes = if is_svg {
        thumb.to_svg().into_bytes()
    } else {
        thumb.to_png().context("Failed to rasterize thumbnail")?
    };
    write_output(Some(output), &bytes)
}

fn watch(ctx: &Session, file: PathBuf, output: &Path) -> Result<()> {
    let mut source = SourceWatcher::new(file, DEFAULT_DEBOUNCE)?;
    let options = ctx.options();
    let initial = RenderState::new(source.source(), &options, ctx.system_is_dark, 1.0);
    let mut surface = LiveSurface::new(Arc::clone(&ctx.renderer), initial).with_options(options);

    let SurfaceCommand::Load(html) = surface.load().context("Failed to build editor page")? else {
        bail!("editor surface did not produce a page");
    };
    write_output(Some(output), html.as_bytes())?;
    // The written page renders its own initial state.
    let _ = surface.on_page_loaded();
    eprintln!(
        "Watching {} (Ctrl-C to stop); update commands follow on stdout",
        source.path().display()
    );

    loop {
        if let Some(code) = source.poll() {
            let state = RenderState::new(code, &ctx.options(), ctx.system_is_dark, surface.pending().zoom);
            if let Some(SurfaceCommand::Evaluate(js)) = surface.update(state) {
                let mut stdout = std::io::stdout().lock();
                writeln!(stdout, "{js}")?;
                stdout.flush()?;
            }
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

fn settings(store: &SettingsStore, action: SettingsCommand) -> Result<()> {
    match action {
        SettingsCommand::Get { key } => println!("{}", store.value(key)),
        SettingsCommand::Set { key, value } => {
            store
                .set_text(key, &value)
                .with_context(|| format!("Failed to set {key}"))?;
            if key.is_shared() {
                eprintln!("Run `mermaidview settings apply` to refresh open previews");
            }
        }
        SettingsCommand::List => {
            for entry in store.list()? {
                let marker = if entry.is_set { "" } else { "  (default)" };
                println!("{} = {}{marker}", entry.key, entry.value);
            }
        }
        SettingsCommand::Reset { key: Some(key) } => store.reset(key)?,
        SettingsCommand::Reset { key: None } => store.reset_all()?,
        SettingsCommand::Apply => {
            let report = apply_to_quicklook().wait();
            tracing::info!(?report, "apply finished");
            println!(
                "Applied ({} of {} steps succeeded)",
                report.steps_run - report.steps_failed,
                report.steps_run
            );
        }
    }
    Ok(())
}

fn shortcuts(store: SettingsStore, action: ShortcutsCommand) -> Result<()> {
    let mut manager = ShortcutManager::load(store);
    match action {
        ShortcutsCommand::List => {
            for action in ShortcutAction::ALL {
                let shortcut = manager.shortcut(action);
                let marker = if manager.is_default(action) { "" } else { "  (custom)" };
                println!("{:<14} {:<20} {shortcut}{marker}", action.as_str(), action.display_name());
            }
        }
        ShortcutsCommand::Set { action, binding } => {
            let event = KeyEvent {
                key_code: 0,
                characters: binding.key.clone(),
                modifiers: binding.modifiers,
            };
            match manager.record(action, &event)? {
                RecordOutcome::Recorded(shortcut) => println!("{action} = {shortcut}"),
                RecordOutcome::Ignored | RecordOutcome::Cancelled => {
                    bail!("{binding} needs at least one of cmd, ctrl or option")
                }
            }
        }
        ShortcutsCommand::Reset { action: Some(action) } => manager.reset(action)?,
        ShortcutsCommand::Reset { action: None } => manager.reset_all()?,
    }
    Ok(())
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<PreviewError>().map_or(1, PreviewError::code);
            ExitCode::from(u8::try_from(code).unwrap_or(1))
        }
    }
}
