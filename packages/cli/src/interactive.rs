//! Interactive menu, used when no subcommand is given.

use dialoguer::{Confirm, Input, Select};
use postcode_map_config::AppConfig;
use postcode_map_search_models::SearchId;
use postcode_map_view::SortOrder;

use crate::session::Session;

enum Action {
    Search,
    Locate,
    History,
    Table,
    Map,
    ToggleStops,
    ToggleCrimes,
    Hide,
    Unhide,
    UnhideAll,
    Remove,
    Clear,
    Status,
    Serve,
    Quit,
}

impl Action {
    const ALL: &[Self] = &[
        Self::Search,
        Self::Locate,
        Self::History,
        Self::Table,
        Self::Map,
        Self::ToggleStops,
        Self::ToggleCrimes,
        Self::Hide,
        Self::Unhide,
        Self::UnhideAll,
        Self::Remove,
        Self::Clear,
        Self::Status,
        Self::Serve,
        Self::Quit,
    ];

    #[must_use]
    const fn label(&self) -> &'static str {
        match self {
            Self::Search => "Search by postcode",
            Self::Locate => "Search by coordinates",
            Self::History => "Show search history",
            Self::Table => "Show results table",
            Self::Map => "Show map",
            Self::ToggleStops => "Toggle all bus stops",
            Self::ToggleCrimes => "Toggle all crimes",
            Self::Hide => "Hide a search from the map",
            Self::Unhide => "Show a hidden search",
            Self::UnhideAll => "Show all hidden searches",
            Self::Remove => "Remove a search",
            Self::Clear => "Clear history",
            Self::Status => "Check backend status",
            Self::Serve => "Start API server",
            Self::Quit => "Quit",
        }
    }
}

/// Runs the menu loop until the user quits.
///
/// # Errors
///
/// Returns an error if the terminal prompts fail or the server cannot
/// start.
pub async fn run(
    session: &mut Session,
    config: AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    println!("Postcode Map");
    println!();

    let labels: Vec<&str> = Action::ALL.iter().map(Action::label).collect();

    loop {
        let idx = Select::new()
            .with_prompt("What would you like to do?")
            .items(&labels)
            .default(0)
            .interact()?;

        match Action::ALL[idx] {
            Action::Search => {
                let postcode: String = Input::new().with_prompt("Postcode").interact_text()?;
                session.search(&postcode).await;
            }
            Action::Locate => {
                let latitude: f64 = Input::new().with_prompt("Latitude").interact_text()?;
                let longitude: f64 = Input::new().with_prompt("Longitude").interact_text()?;
                session.locate(latitude, longitude).await;
            }
            Action::History => println!("{}", session.history()),
            Action::Table => {
                let options = session.explorer().options();
                println!("{}", session.table(options, SortOrder::Descending));
            }
            Action::Map => println!("{}", session.map()),
            Action::ToggleStops => {
                let options = session.toggle_stops();
                println!(
                    "All bus stops {}",
                    if options.show_all_stops { "shown" } else { "hidden" }
                );
            }
            Action::ToggleCrimes => {
                let options = session.toggle_crimes();
                println!(
                    "All crimes {}",
                    if options.show_all_crimes { "shown" } else { "hidden" }
                );
            }
            Action::Hide => {
                if let Some(id) = pick(session, "Hide which search?", |hidden| !hidden)? {
                    session.hide(id);
                }
            }
            Action::Unhide => {
                if let Some(id) = pick(session, "Show which search?", |hidden| hidden)? {
                    session.unhide(id);
                }
            }
            Action::UnhideAll => {
                println!("{} search(es) shown again", session.unhide_all());
            }
            Action::Remove => {
                if let Some(id) = pick(session, "Remove which search?", |_| true)? {
                    session.remove(id);
                }
            }
            Action::Clear => {
                if Confirm::new()
                    .with_prompt("Remove every search from the history?")
                    .default(false)
                    .interact()?
                {
                    session.clear();
                }
            }
            Action::Status => {
                session.status().await;
            }
            Action::Serve => {
                // actix-web brings its own runtime; keep it off this one.
                let config = config.clone();
                tokio::task::spawn_blocking(move || {
                    actix_web::rt::System::new().block_on(postcode_map_server::interactive::run(config))
                })
                .await??;
                return Ok(());
            }
            Action::Quit => return Ok(()),
        }

        println!();
    }
}

/// Lets the user choose one history entry whose hidden flag satisfies
/// `filter`. Returns `None` when there is nothing to choose.
fn pick(
    session: &Session,
    prompt: &str,
    filter: impl Fn(bool) -> bool,
) -> Result<Option<SearchId>, dialoguer::Error> {
    let candidates: Vec<(SearchId, String)> = session
        .explorer()
        .history()
        .items()
        .iter()
        .filter(|entry| filter(entry.hidden))
        .map(|entry| {
            (
                entry.search_id(),
                format!("{} ({})", entry.response.postcode(), entry.search_id()),
            )
        })
        .collect();

    if candidates.is_empty() {
        println!("Nothing to choose from.");
        return Ok(None);
    }

    let labels: Vec<&str> = candidates.iter().map(|(_, label)| label.as_str()).collect();
    let idx = Select::new()
        .with_prompt(prompt)
        .items(&labels)
        .default(0)
        .interact()?;

    Ok(Some(candidates[idx].0))
}
