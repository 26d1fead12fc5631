use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tubemaster_core::app::{App, AppBuilder, AutoPilot, ProfileService};
use tubemaster_core::codec::export_file_name;
use tubemaster_core::config::AppConfig;
use tubemaster_core::domain::stats::status_counts;
use tubemaster_core::domain::{
    ChannelProfile, ContentRequest, Credential, ProfileId, ProfileUpdate, RowId, ScriptEdit,
    ScriptId, VideoFormat,
};
use tubemaster_core::impls::{
    ActivityLog, FileKvStore, GeminiGenerator, KvStateStore, OfflineGenerator,
};
use tubemaster_core::ports::ContentGenerator;

#[derive(Parser, Debug)]
#[command(name = "tubemaster", version, about = "YouTube channel automation: planner, auto-pilot and content studio")]
struct Cli {
    /// JSON config file (default: <config dir>/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Where state files are kept (overrides config and TUBEMASTER_DATA_DIR)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use the deterministic offline generator instead of the Gemini API
    #[arg(long, global = true)]
    offline: bool,

    /// Profile to act on (default: the active profile)
    #[arg(long, global = true)]
    profile: Option<ProfileId>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Manage channel profiles
    #[command(subcommand)]
    Profile(ProfileCmd),
    /// Planner rows and the auto-pilot
    #[command(subcommand)]
    Rows(RowsCmd),
    /// Content studio scripts
    #[command(subcommand)]
    Script(ScriptCmd),
    /// Trending video ideas for a niche
    Trends { niche: String },
    /// Audit the channel, or show the latest audit when no info is given
    Audit { info: Option<String> },
    /// Summary for the profile
    Dashboard,
}

#[derive(Subcommand, Debug)]
enum ProfileCmd {
    List,
    Show,
    Add { name: Option<String> },
    Delete { id: ProfileId },
    Switch { id: ProfileId },
    /// Edit fields of the selected profile
    Set(ProfileFields),
}

#[derive(Args, Debug)]
struct ProfileFields {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    gemini_key: Option<String>,
    #[arg(long)]
    youtube_api_key: Option<String>,
    #[arg(long)]
    youtube_client_id: Option<String>,
    #[arg(long)]
    youtube_client_secret: Option<String>,
    #[arg(long)]
    channel_id: Option<String>,
    #[arg(long)]
    sheet_id: Option<String>,
    /// Seconds between optimize and upload while the auto-pilot runs
    #[arg(long)]
    upload_delay: Option<u64>,
    #[arg(long)]
    tone: Option<String>,
}

impl From<ProfileFields> for ProfileUpdate {
    fn from(f: ProfileFields) -> Self {
        ProfileUpdate {
            name: f.name,
            description: f.description,
            avatar_color: None,
            youtube_api_key: f.youtube_api_key.map(Credential::new),
            youtube_client_id: f.youtube_client_id.map(Credential::new),
            youtube_client_secret: f.youtube_client_secret.map(Credential::new),
            channel_id: f.channel_id,
            sheet_id: f.sheet_id,
            gemini_api_key: f.gemini_key.map(Credential::new),
            auto_upload_delay: f.upload_delay,
            default_tone: f.tone,
        }
    }
}

#[derive(Args, Debug, Clone, Copy)]
struct RunFlags {
    /// Stop at OPTIMIZED instead of uploading
    #[arg(long)]
    no_upload: bool,
    /// Override the profile's upload delay (seconds) for this run
    #[arg(long)]
    upload_delay: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum RowsCmd {
    List,
    /// Append topics from a CSV file
    Import { file: PathBuf },
    /// Write all rows as CSV (default file: tube_master_export_<date>.csv)
    Export {
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Append the three sample topics
    Sample,
    Clear,
    /// Run one PENDING or ERROR row now
    Process {
        id: RowId,
        #[command(flatten)]
        flags: RunFlags,
    },
    /// Start the auto-pilot until the queue is empty (Ctrl-C stops after the current row)
    Run {
        #[command(flatten)]
        flags: RunFlags,
    },
}

#[derive(Subcommand, Debug)]
enum ScriptCmd {
    Generate {
        topic: String,
        #[arg(long)]
        tone: Option<String>,
        /// Vertical short instead of a long video
        #[arg(long)]
        short: bool,
        /// Video id to take inspiration from
        #[arg(long)]
        reference: Option<String>,
    },
    List,
    Show { id: ScriptId },
    Edit {
        id: ScriptId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Replace the body with the contents of a file
        #[arg(long)]
        content_file: Option<PathBuf>,
        /// Comma separated
        #[arg(long)]
        tags: Option<String>,
    },
    Delete { id: ScriptId },
    /// Append the script to the planner as an OPTIMIZED row
    Push { id: ScriptId },
    /// Write the script as text
    Export {
        id: ScriptId,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    Thumbnails {
        id: ScriptId,
        #[arg(long, default_value = "cinematic, high contrast")]
        style: String,
    },
    Thumbnail {
        id: ScriptId,
        #[arg(long)]
        prompt: Option<String>,
        #[arg(long)]
        style: Option<String>,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Social { id: ScriptId },
    Rewrite { id: ScriptId },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = &cli.data_dir {
        config.data_dir = Some(dir.clone());
    }
    init_tracing(config.log_filter());

    let app = build_app(&config, cli.offline).await?;
    let profiles = app.profiles().await.context("loading profiles")?;

    match cli.command {
        Command::Profile(cmd) => profile_cmd(&profiles, cli.profile, cmd).await,
        Command::Rows(cmd) => {
            let profile = select_profile(&profiles, cli.profile).await?;
            rows_cmd(&app, profile, cmd).await
        }
        Command::Script(cmd) => {
            let profile = select_profile(&profiles, cli.profile).await?;
            script_cmd(&app, profile, cmd).await
        }
        Command::Trends { niche } => {
            let profile = select_profile(&profiles, cli.profile).await?;
            let report = app.studio().find_trends(&profile, &niche).await?;
            for (i, idea) in report.ideas.iter().enumerate() {
                println!("{}. {idea}", i + 1);
            }
            if !report.sources.is_empty() {
                println!("\nSources:");
                for source in &report.sources {
                    println!("  {} <{}>", source.title, source.uri);
                }
            }
            Ok(())
        }
        Command::Audit { info } => {
            let profile = select_profile(&profiles, cli.profile).await?;
            let audit = match info {
                Some(info) => app.audit().run(&profile, &info).await?,
                None => match app.audit().latest(profile.id).await? {
                    Some(audit) => audit,
                    None => bail!("no audit yet for {}; pass channel info to run one", profile.name),
                },
            };
            println!("{}", serde_json::to_string_pretty(&audit)?);
            Ok(())
        }
        Command::Dashboard => {
            let profile = select_profile(&profiles, cli.profile).await?;
            let stats = app.dashboard(profile.id).await?;
            println!("Profile:       {}", profile.name);
            println!("Pending tasks: {}", stats.pending_tasks);
            println!("Scripts:       {}", stats.scripts);
            match stats.health_score {
                Some(score) => println!("Health:        {score:.0} ({:?})", stats.health),
                None => println!("Health:        no audit yet"),
            }
            Ok(())
        }
    }
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn build_app(config: &AppConfig, offline: bool) -> Result<App> {
    let data_dir = config.resolve_data_dir()?;
    tokio::fs::create_dir_all(&data_dir)
        .await
        .with_context(|| format!("creating data dir {}", data_dir.display()))?;
    tracing::debug!(data_dir = %data_dir.display(), offline, "opening store");

    let generator: Arc<dyn ContentGenerator> = if offline {
        Arc::new(OfflineGenerator::new())
    } else {
        Arc::new(GeminiGenerator::new(config.gemini.clone())?)
    };

    let app = AppBuilder::new()
        .store(Arc::new(KvStateStore::new(Arc::new(FileKvStore::new(data_dir)))))
        .generator(generator)
        .activity_log(ActivityLog::default())
        .settings(config.planner)
        .build()?;
    Ok(app)
}

async fn select_profile(
    profiles: &ProfileService,
    id: Option<ProfileId>,
) -> Result<ChannelProfile> {
    let profile = match id {
        Some(id) => profiles.get(id).await?,
        None => profiles.active().await?,
    };
    Ok(profile)
}

async fn profile_cmd(
    profiles: &ProfileService,
    selected: Option<ProfileId>,
    cmd: ProfileCmd,
) -> Result<()> {
    match cmd {
        ProfileCmd::List => {
            let state = profiles.snapshot().await;
            for p in &state.profiles {
                let marker = if state.active_profile_id == Some(p.id) { "*" } else { " " };
                println!("{marker} {}  {}", p.id, p.name);
            }
        }
        ProfileCmd::Show => {
            let p = select_profile(profiles, selected).await?;
            println!("id:             {}", p.id);
            println!("name:           {}", p.name);
            println!("description:    {}", p.description.as_deref().unwrap_or("-"));
            println!("gemini key:     {}", p.gemini_api_key.masked());
            println!("youtube key:    {}", p.youtube_api_key.masked());
            println!("channel id:     {}", p.channel_id);
            println!("sheet id:       {}", p.sheet_id);
            println!("upload delay:   {}s", p.auto_upload_delay);
            println!("default tone:   {}", p.default_tone);
        }
        ProfileCmd::Add { name } => {
            let p = profiles.add(name).await?;
            println!("added {} ({})", p.name, p.id);
        }
        ProfileCmd::Delete { id } => {
            profiles.delete(id).await?;
            println!("deleted {id}");
        }
        ProfileCmd::Switch { id } => {
            let p = profiles.switch(id).await?;
            println!("active profile: {}", p.name);
        }
        ProfileCmd::Set(fields) => {
            let id = select_profile(profiles, selected).await?.id;
            let p = profiles.update(id, fields.into()).await?;
            println!("updated {}", p.name);
        }
    }
    Ok(())
}

async fn rows_cmd(app: &App, profile: ChannelProfile, cmd: RowsCmd) -> Result<()> {
    let planner = app.open_planner(profile).await?;

    match cmd {
        RowsCmd::List => {
            let rows = planner.rows().await;
            for row in &rows {
                println!(
                    "{}  {:<10} {:>3}  {}",
                    row.id,
                    row.status,
                    row.seo_score.map(|s| s.to_string()).unwrap_or_default(),
                    row.optimized_title.as_deref().unwrap_or(&row.topic)
                );
            }
            let counts: Vec<String> = status_counts(&rows)
                .into_iter()
                .map(|(status, n)| format!("{status}: {n}"))
                .collect();
            println!("{} rows  {}", rows.len(), counts.join(", "));
        }
        RowsCmd::Import { file } => {
            let text = tokio::fs::read_to_string(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let n = planner.import_csv(&text).await?;
            println!("imported {n} rows");
        }
        RowsCmd::Export { out } => {
            let text = planner.export_csv().await?;
            let out = out.unwrap_or_else(|| PathBuf::from(export_file_name(Utc::now().date_naive())));
            write_file(&out, text.as_bytes()).await?;
            println!("wrote {}", out.display());
        }
        RowsCmd::Sample => {
            planner.load_sample_data().await?;
        }
        RowsCmd::Clear => {
            let n = planner.clear_all().await?;
            println!("removed {n} rows");
        }
        RowsCmd::Process { id, flags } => {
            apply_flags(&planner, flags);
            let row = planner.process_row(id).await?;
            println!("{}  {}", row.id, row.status);
        }
        RowsCmd::Run { flags } => {
            apply_flags(&planner, flags);
            let pilot = AutoPilot::start(planner.clone())?;
            let ctrl_c = tokio::signal::ctrl_c();
            tokio::pin!(ctrl_c);

            loop {
                tokio::select! {
                    result = &mut ctrl_c => {
                        result.context("listening for Ctrl-C")?;
                        eprintln!("stopping after the current row...");
                        pilot.request_stop();
                        break;
                    }
                    _ = tokio::time::sleep(Duration::from_millis(200)) => {
                        if pilot.is_finished() {
                            break;
                        }
                    }
                }
            }
            let exit = pilot.join().await;
            println!("auto-pilot finished: {exit:?}");
        }
    }
    Ok(())
}

fn apply_flags(planner: &tubemaster_core::app::Planner, flags: RunFlags) {
    if flags.no_upload {
        planner.set_auto_upload(false);
    }
    if let Some(secs) = flags.upload_delay {
        planner.set_upload_delay(secs);
    }
}

async fn script_cmd(app: &App, profile: ChannelProfile, cmd: ScriptCmd) -> Result<()> {
    let studio = app.studio();

    match cmd {
        ScriptCmd::Generate {
            topic,
            tone,
            short,
            reference,
        } => {
            let format = if short { VideoFormat::Short } else { VideoFormat::Long };
            let tone = tone.unwrap_or_else(|| profile.default_tone.clone());
            let mut request = ContentRequest::new(topic, tone, format);
            request.related_video_id = reference;
            let script = studio.generate(&profile, request).await?;
            println!("{}  {}", script.id, script.title);
        }
        ScriptCmd::List => {
            for s in studio.scripts(profile.id).await? {
                println!(
                    "{}  {}  {}",
                    s.id,
                    s.last_modified.format("%Y-%m-%d %H:%M"),
                    s.title
                );
            }
        }
        ScriptCmd::Show { id } => {
            println!("{}", studio.script(id).await?.render_text());
        }
        ScriptCmd::Edit {
            id,
            title,
            description,
            content_file,
            tags,
        } => {
            let content = match content_file {
                Some(path) => Some(
                    tokio::fs::read_to_string(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?,
                ),
                None => None,
            };
            let edit = ScriptEdit {
                title,
                description,
                content,
                tags: tags.map(|t| {
                    t.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                }),
                ..Default::default()
            };
            let script = studio.save_edits(id, edit).await?;
            println!("saved {}", script.title);
        }
        ScriptCmd::Delete { id } => {
            studio.delete(id).await?;
            println!("deleted {id}");
        }
        ScriptCmd::Push { id } => {
            let planner = app.open_planner(profile).await?;
            let row = studio.push_to_planner(id, &planner).await?;
            println!("row {} added as {}", row.id, row.status);
        }
        ScriptCmd::Export { id, dir } => {
            let (name, text) = studio.export_text(id).await?;
            let path = dir.join(name);
            write_file(&path, text.as_bytes()).await?;
            println!("wrote {}", path.display());
        }
        ScriptCmd::Thumbnails { id, style } => {
            for (i, idea) in studio
                .suggest_thumbnails(&profile, id, &style)
                .await?
                .iter()
                .enumerate()
            {
                println!("{}. {idea}", i + 1);
            }
        }
        ScriptCmd::Thumbnail {
            id,
            prompt,
            style,
            out,
        } => {
            let image = studio
                .render_thumbnail(&profile, id, prompt, style.as_deref())
                .await?;
            let out = out.unwrap_or_else(|| PathBuf::from(format!("{id}.{}", image.extension())));
            write_file(&out, &image.bytes).await?;
            println!("wrote {}", out.display());
        }
        ScriptCmd::Social { id } => {
            let posts = studio.generate_social_posts(&profile, id).await?;
            println!("{}", serde_json::to_string_pretty(&posts)?);
        }
        ScriptCmd::Rewrite { id } => {
            println!("{}", studio.rewrite_description(&profile, id).await?);
        }
    }
    Ok(())
}

async fn write_file(path: &Path, bytes: &[u8]) -> Result<()> {
    tokio::fs::write(path, bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))
}
