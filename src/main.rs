mod dispatch;
mod error;
mod fetch;
mod highlight;
mod page;
mod resolve;
mod rewrite;
mod serve;
mod web_assets;

use std::{
    fs, io,
    path::PathBuf,
    process::ExitCode,
    sync::Arc,
};

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use error::Error;
use highlight::{Highlight, PlainHighlighter, SyntectHighlighter};
use resolve::{Endpoints, ResolutionContext, ResolvedUrls};

/// Base URLs for the outbound services, shared by `serve` and `resolve`.
#[derive(Args)]
struct EndpointArgs {
    /// CDN base; files live at `<base>/<user>/<repo>@<ref>/<path>`
    #[arg(long, default_value = resolve::DEFAULT_CDN_BASE)]
    cdn_base: String,
    /// Source-hosting base for `rtn=ghr`
    #[arg(long, default_value = resolve::DEFAULT_SOURCE_BASE)]
    source_base: String,
    /// Web editor base for `rtn=ghs`
    #[arg(long, default_value = resolve::DEFAULT_EDITOR_BASE)]
    editor_base: String,
    /// In-browser sandbox base for `rtn=stz`
    #[arg(long, default_value = resolve::DEFAULT_SANDBOX_BASE)]
    sandbox_base: String,
}

impl EndpointArgs {
    fn endpoints(&self) -> Endpoints {
        Endpoints::new(
            &self.cdn_base,
            &self.source_base,
            &self.editor_base,
            &self.sandbox_base,
        )
    }
}

/// Engine behind the `rtn=scd` code view.
#[derive(Clone, Copy, ValueEnum)]
enum HighlighterKind {
    /// syntect with its bundled grammars and themes
    Syntect,
    /// HTML-escaped text, no colouring
    Plain,
}

/// Explicit subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Serve the viewer over HTTP
    Serve {
        /// Interface address to bind to
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
        /// Starting port number for the HTTP server
        #[arg(long, default_value = "3333")]
        port: u16,
        #[command(flatten)]
        endpoints: EndpointArgs,
        /// Highlighting engine for the code view
        #[arg(long, value_enum, default_value_t = HighlighterKind::Syntect)]
        highlighter: HighlighterKind,
        /// syntect theme name
        #[arg(long, default_value = highlight::DEFAULT_THEME)]
        theme: String,
    },
    /// Print the context and URLs a viewer query string resolves to
    Resolve {
        /// Query string, e.g. `user=acme&repo=site&path=index.html`
        #[arg(default_value = "")]
        query: String,
        #[command(flatten)]
        endpoints: EndpointArgs,
        /// Emit JSON instead of aligned text
        #[arg(long)]
        json: bool,
    },
    /// Rewrite relative asset references in a local file and print it
    Rewrite {
        /// File to rewrite
        file: PathBuf,
        /// Content root the references should resolve against
        #[arg(long)]
        root: String,
        /// Rewrite even when the file does not look like HTML
        #[arg(long)]
        force: bool,
    },
}

#[derive(Parser)]
#[command(
    name = "cdnview",
    version,
    about = "Redirect to, highlight, or render files hosted on a public repository CDN"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let result = match cli.command {
        Commands::Serve {
            bind,
            port,
            endpoints,
            highlighter,
            theme,
        } => run_serve(bind, port, endpoints.endpoints(), highlighter, &theme),
        Commands::Resolve {
            query,
            endpoints,
            json,
        } => run_resolve(&query, &endpoints.endpoints(), json),
        Commands::Rewrite { file, root, force } => run_rewrite(file, &root, force),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run_serve(
    bind: String,
    port: u16,
    endpoints: Endpoints,
    kind: HighlighterKind,
    theme: &str,
) -> Result<(), Error> {
    let highlighter: Arc<dyn Highlight> = match kind {
        HighlighterKind::Syntect => Arc::new(SyntectHighlighter::new(theme)?),
        HighlighterKind::Plain => Arc::new(PlainHighlighter),
    };

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(serve::run_serve(serve::ServeConfig {
        bind_addr: bind,
        start_port: port,
        endpoints,
        highlighter,
    }))
}

fn run_resolve(query: &str, endpoints: &Endpoints, json: bool) -> Result<(), Error> {
    let ctx = ResolutionContext::from_query(query.strip_prefix('?').unwrap_or(query));
    let urls = ResolvedUrls::resolve(&ctx, endpoints);

    if json {
        let value = serde_json::json!({ "context": ctx, "urls": urls });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let mode = ctx.mode.map(resolve::ReturnMode::as_str).unwrap_or("document");
    println!("owner:        {}", ctx.owner);
    println!("repo:         {}", ctx.repo);
    println!("path:         {}", ctx.path);
    println!("ref:          {}", ctx.reference);
    println!("mode:         {mode}");
    println!("rewrite:      {}", ctx.rewrite);
    println!("content_root: {}", urls.content_root);
    println!("file:         {}", urls.file);
    println!("repo_page:    {}", urls.repo_page);
    println!("editor:       {}", urls.editor);
    println!("sandbox:      {}", urls.sandbox);
    Ok(())
}

fn run_rewrite(file: PathBuf, root: &str, force: bool) -> Result<(), Error> {
    let content = fs::read_to_string(&file).map_err(|source| Error::ReadInput {
        path: file.clone(),
        source,
    })?;

    let path = file.to_string_lossy();
    if !force && !rewrite::looks_like_html(&path, &content) {
        tracing::info!(file = %path, "not HTML; printing unchanged");
        print!("{content}");
        return Ok(());
    }

    let root = root.trim_end_matches('/');
    print!("{}", rewrite::rewrite_assets(&content, root));
    Ok(())
}
