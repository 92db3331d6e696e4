use anyhow::Context;
use clap::Parser;
use uuid::Uuid;

use fortune_teller::cli::{self, ProviderKind};
use fortune_teller::config::Config;
use fortune_teller::log::{self, Transcript};
use fortune_teller::provider;
use fortune_teller::session::{self, Outcome, Session};
use fortune_teller::teller::FortuneTeller;
use fortune_teller::ux::Terminal;
use fortune_teller::vocab::Vocabulary;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = cli::Args::parse();

    let mut cfg = Config::load(args.config.as_deref())?;
    cfg.apply_args(&args);
    // Test mode only prints card titles and never reaches the network.
    if cfg.test_mode {
        cfg.provider = ProviderKind::Offline;
    }
    log::init_tracing(cfg.debug);

    let session_id = Uuid::new_v4();
    tracing::debug!(%session_id, provider = ?cfg.provider, models = ?cfg.models(), "starting");

    let mut console = Terminal::new();
    let language = session::choose_language(&mut console, cfg.preset_language()?)?;
    let language_dir = cfg.language_dir(language);
    let vocab = Vocabulary::load(&language_dir)
        .with_context(|| format!("loading language files from {}", language_dir.display()))?;

    let prov = provider::make_provider(&cfg)?;
    let transcript = Transcript::new(&cfg.root, session_id, cfg.save_transcript);
    if cfg.save_transcript {
        println!("debug: transcript directory: {}", transcript.dir().display());
    }

    let teller = FortuneTeller::new(vocab, prov, &cfg, transcript);
    let mut session = Session::new(teller, &mut console, &cfg);
    let outcome = session.run().await?;

    match &outcome {
        Outcome::Completed { cards, report } => {
            tracing::info!(cards = cards.len(), report = ?report, "reading finished");
        }
        other => tracing::info!(outcome = ?other, "no reading"),
    }
    Ok(())
}
