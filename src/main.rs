#![cfg_attr(target_os = "windows", windows_subsystem = "windows")]

use crossbeam_channel::{Receiver, Sender};
use std::thread;

mod config;
mod logger;
mod toast;
mod translator;
mod ui;
mod workspace;

use config::{JsonFileStore, Preferences};
use translator::Translator;
use ui::Outcome;
use workspace::TranslationJob;

/// Runs translations one at a time on a dedicated thread with its own runtime.
fn spawn_worker(translator: Translator) -> (Sender<TranslationJob>, Receiver<Outcome>) {
    let (job_tx, job_rx) = crossbeam_channel::unbounded::<TranslationJob>();
    let (out_tx, out_rx) = crossbeam_channel::unbounded::<Outcome>();

    thread::spawn(move || {
        let rt = match tokio::runtime::Runtime::new() {
            Ok(rt) => rt,
            Err(e) => {
                tracing::error!("failed to start tokio runtime: {}", e);
                return;
            }
        };
        while let Ok(job) = job_rx.recv() {
            let res = rt.block_on(translator.translate(
                &job.text,
                &job.source_lang,
                &job.target_lang,
                &job.credential,
                &job.model,
            ));
            match &res {
                Ok(out) => tracing::info!("translation done ({} chars)", out.chars().count()),
                Err(e) => tracing::warn!("translation error: {}", e),
            }
            if out_tx.send(res).is_err() {
                break;
            }
        }
        tracing::info!("translation worker stopped");
    });

    (job_tx, out_rx)
}

fn main() -> anyhow::Result<()> {
    let _log_guard = logger::init();

    // config.json next to the exe; env vars override for this run
    let path = JsonFileStore::default_path();
    let mut prefs = Preferences::load(Box::new(JsonFileStore::open(&path)));
    prefs.apply_env_overrides();
    tracing::info!(
        "preferences loaded from {} (model {}, theme {}, key {})",
        path.display(),
        prefs.model(),
        prefs.theme().as_str(),
        if prefs.api_key().is_empty() { "missing" } else { "set" }
    );
    if let Some(t) = prefs.timeout() {
        tracing::info!("request timeout {}s", t.as_secs());
    }

    let translator = Translator::new(prefs.timeout())?;
    let (jobs, outcomes) = spawn_worker(translator);

    ui::run(prefs, jobs, outcomes)
}
