//! Hockey division standings scraped from a public standings page.
//!
//! A background task downloads the page while the LCD shows standings and
//! publishes the rendered lines to a [`StandingsBoard`]. The LCD engine only
//! ever reads the board, so a slow or failing fetch never stalls a tick.

use regex::Regex;
use std::cmp::Ordering;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::StandingsConfig;
use crate::modes::{blank_text, LcdMode, LcdText};
use crate::state::SharedState;
use crate::throttle::WarnThrottle;
use casecontrol_hw::LCD_HEIGHT;

/// How often the fetch task checks whether standings are on screen.
const MODE_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Shown until the first successful fetch.
const PLACEHOLDER: &str = "Loading standings...";

/// Standings errors.
#[derive(Debug, thiserror::Error)]
pub enum StandingsError {
    #[error("request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("no standings table in page")]
    NoTable,

    #[error("no team records found")]
    NoTeams,

    #[error("bad team pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// League divisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    Atlantic,
    Metropolitan,
    Central,
    Pacific,
}

impl FromStr for Division {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "atlantic" | "atl" => Ok(Division::Atlantic),
            "metropolitan" | "metro" => Ok(Division::Metropolitan),
            "central" | "ctl" => Ok(Division::Central),
            "pacific" | "pac" => Ok(Division::Pacific),
            _ => Err(format!("Unknown division: {}", s)),
        }
    }
}

impl std::fmt::Display for Division {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Division::Atlantic => write!(f, "Atlantic"),
            Division::Metropolitan => write!(f, "Metropolitan"),
            Division::Central => write!(f, "Central"),
            Division::Pacific => write!(f, "Pacific"),
        }
    }
}

/// A tracked team.
#[derive(Debug, PartialEq, Eq)]
pub struct Team {
    pub division: Division,
    /// Name as printed on the standings page
    pub name: &'static str,
    pub abbrev: &'static str,
}

const fn team(division: Division, name: &'static str, abbrev: &'static str) -> Team {
    Team {
        division,
        name,
        abbrev,
    }
}

pub static TEAMS: [Team; 30] = [
    team(Division::Atlantic, "Florida", "FLA"),
    team(Division::Atlantic, "Montreal", "MTL"),
    team(Division::Atlantic, "Toronto", "TOR"),
    team(Division::Atlantic, "Tampa Bay", "TBL"),
    team(Division::Atlantic, "Ottawa", "OTT"),
    team(Division::Atlantic, "Boston", "BOS"),
    team(Division::Atlantic, "Buffalo", "BUF"),
    team(Division::Atlantic, "Detroit", "DET"),
    team(Division::Metropolitan, "Pittsburgh", "PIT"),
    team(Division::Metropolitan, "Philadelphia", "PHI"),
    team(Division::Metropolitan, "Washington", "WSH"),
    team(Division::Metropolitan, "NY Rangers", "NYR"),
    team(Division::Metropolitan, "Carolina", "CAR"),
    team(Division::Metropolitan, "New Jersey", "NJD"),
    team(Division::Metropolitan, "NY Islanders", "NYI"),
    team(Division::Metropolitan, "Columbus", "CBJ"),
    team(Division::Central, "St. Louis", "STL"),
    team(Division::Central, "Colorado", "COL"),
    team(Division::Central, "Dallas", "DAL"),
    team(Division::Central, "Winnipeg", "WPG"),
    team(Division::Central, "Minnesota", "MIN"),
    team(Division::Central, "Nashville", "NSH"),
    team(Division::Central, "Chicago", "CHI"),
    team(Division::Pacific, "Edmonton", "EDM"),
    team(Division::Pacific, "San Jose", "SJS"),
    team(Division::Pacific, "Arizona", "ARI"),
    team(Division::Pacific, "Vancouver", "VAN"),
    team(Division::Pacific, "Calgary", "CGY"),
    team(Division::Pacific, "Anaheim", "ANA"),
    team(Division::Pacific, "Los Angeles", "LAK"),
];

/// One team's standings line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub games_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub ot_losses: u32,
    pub points: u32,
    /// Regulation plus overtime wins
    pub row_wins: u32,
    pub so_wins: u32,
    pub so_losses: u32,
}

impl Stats {
    /// Standings order: points, then fewer games played, then ROW.
    pub fn rank_cmp(&self, other: &Stats) -> Ordering {
        other
            .points
            .cmp(&self.points)
            .then(self.games_played.cmp(&other.games_played))
            .then(other.row_wins.cmp(&self.row_wins))
    }
}

/// Extracts every tracked team's stats from the page.
///
/// Teams whose record cannot be found are skipped.
pub fn parse_standings(html: &str) -> Result<Vec<(&'static Team, Stats)>, StandingsError> {
    let page: String = html.lines().collect();
    let table_re = Regex::new(r"<table.*</table>")?;
    let table = table_re.find(&page).ok_or(StandingsError::NoTable)?.as_str();

    let mut standings = Vec::new();
    for team in &TEAMS {
        let pattern = format!(
            "{}{}",
            regex::escape(team.name),
            r".*?(\d+)".repeat(8)
        );
        let team_re = Regex::new(&pattern)?;
        let Some(captures) = team_re.captures(table) else {
            debug!("No standings record for {}", team.name);
            continue;
        };

        let mut values = [0u32; 8];
        for (value, group) in values.iter_mut().zip(captures.iter().skip(1)) {
            *value = group.and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
        }
        let [games_played, wins, losses, ot_losses, points, row_wins, so_wins, so_losses] =
            values;
        standings.push((
            team,
            Stats {
                games_played,
                wins,
                losses,
                ot_losses,
                points,
                row_wins,
                so_wins,
                so_losses,
            },
        ));
    }

    if standings.is_empty() {
        return Err(StandingsError::NoTeams);
    }
    Ok(standings)
}

/// Returns one division's teams in standings order.
pub fn rank_division(
    standings: &[(&'static Team, Stats)],
    division: Division,
) -> Vec<(&'static Team, Stats)> {
    let mut ranked: Vec<_> = standings
        .iter()
        .filter(|(team, _)| team.division == division)
        .copied()
        .collect();
    ranked.sort_by(|(_, a), (_, b)| a.rank_cmp(b));
    ranked
}

/// Lays out ranked teams as `"{rank}.{ABBR} {pts}"` entries, wrapping
/// every fourth entry onto the same line.
///
/// Columns are 10 wide, so two entries with 3-digit points fit in 19
/// characters.
pub fn render_ranking(ranked: &[(&'static Team, Stats)]) -> LcdText {
    let mut text = blank_text();
    for (i, (team, stats)) in ranked.iter().enumerate() {
        let line = &mut text[i % LCD_HEIGHT];
        if !line.is_empty() {
            line.push(' ');
        }
        line.push_str(&format!("{}.{} {:<3}", i + 1, team.abbrev, stats.points));
    }
    for line in &mut text {
        line.truncate(line.trim_end().len());
    }
    text
}

/// Latest rendered standings, shared between the fetch task and the LCD.
#[derive(Clone, Default)]
pub struct StandingsBoard {
    lines: Arc<RwLock<Option<LcdText>>>,
}

impl StandingsBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current lines, or a placeholder before the first fetch.
    pub fn text(&self) -> LcdText {
        let lines = self.lines.read().unwrap_or_else(PoisonError::into_inner);
        match &*lines {
            Some(text) => text.clone(),
            None => {
                let mut text = blank_text();
                text[0] = PLACEHOLDER.to_string();
                text
            }
        }
    }

    /// Replaces the shown standings.
    pub fn publish(&self, text: LcdText) {
        *self.lines.write().unwrap_or_else(PoisonError::into_inner) = Some(text);
    }
}

/// Downloads and renders one division.
async fn fetch_division(
    client: &reqwest::Client,
    url: &str,
    division: Division,
) -> Result<LcdText, StandingsError> {
    let html = client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;
    let standings = parse_standings(&html)?;
    Ok(render_ranking(&rank_division(&standings, division)))
}

/// Keeps the board fresh while the LCD is in standings mode.
///
/// Fetches right away when the mode is entered and then every configured
/// interval. Failures keep whatever the board already shows.
pub async fn standings_loop(
    config: StandingsConfig,
    state: Arc<SharedState>,
    board: StandingsBoard,
    mut shutdown: watch::Receiver<bool>,
) {
    let division = config.division.parse::<Division>().unwrap_or_else(|e| {
        warn!("{}, showing {}", e, Division::Metropolitan);
        Division::Metropolitan
    });
    let client = match reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout))
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            warn!("Standings disabled, HTTP client unavailable: {}", e);
            return;
        }
    };
    let interval = Duration::from_millis(config.interval);

    let mut last_fetch: Option<Instant> = None;
    let mut errors = WarnThrottle::new("Standings update failed");

    loop {
        if *shutdown.borrow() {
            break;
        }

        if state.lcd_mode() != LcdMode::Standings {
            // Leaving the mode forgets the schedule so re-entry fetches at once
            last_fetch = None;
        } else if last_fetch.map_or(true, |at| at.elapsed() >= interval) {
            last_fetch = Some(Instant::now());
            match fetch_division(&client, &config.url, division).await {
                Ok(text) => {
                    info!("Updated {} standings", division);
                    board.publish(text);
                    errors.success();
                }
                Err(e) => {
                    errors.failure(&e);
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(MODE_POLL_INTERVAL) => {}
            changed = shutdown.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Standings task stopped");
}
