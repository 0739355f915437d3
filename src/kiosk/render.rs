// Text rendering for the terminal kiosk
//
// Only the slide matching the current index is rendered. Lines are plain
// strings; the binary decides how to put them on screen.

use super::{KioskView, Slide, SlideData};
use crate::models::{AppState, NotificationLevel, PlayerSearch, ProgramMap, TopGame};
use tokio::time::Instant;

pub fn render_slide(slide: &Slide) -> Vec<String> {
    match &slide.data {
        SlideData::Program(program) => render_program(program),
        SlideData::PlayerSearches(searches) => render_player_searches(searches),
        SlideData::TopGames(games) => render_top_games(games),
    }
}

fn render_program(program: &ProgramMap) -> Vec<String> {
    if program.values().all(Vec::is_empty) {
        return vec!["Kein Programm veröffentlicht.".to_string()];
    }

    let mut lines = Vec::new();
    for (day, entries) in program {
        if entries.is_empty() {
            continue;
        }
        lines.push(day.clone());
        for entry in entries {
            let time = match &entry.end {
                Some(end) => format!("{}-{}", entry.start, end),
                None => entry.start.clone(),
            };
            let mut line = format!("  {:<11} {}", time, entry.title);
            if let Some(location) = &entry.location {
                line.push_str(&format!(" ({})", location));
            }
            match entry.available {
                Some(0) => line.push_str(" - ausgebucht"),
                Some(seats) => line.push_str(&format!(" - {} frei", seats)),
                None => {}
            }
            lines.push(line);
        }
    }
    lines
}

fn render_player_searches(searches: &[PlayerSearch]) -> Vec<String> {
    if searches.is_empty() {
        return vec!["Gerade sucht niemand Mitspieler.".to_string()];
    }

    searches
        .iter()
        .map(|search| {
            let mut line = format!(
                "  {} - noch {} von {} Plätzen frei",
                search.game_title,
                search.seats_left(),
                search.players_needed
            );
            if let Some(time) = &search.time {
                line.push_str(&format!(", {}", time));
            }
            if let Some(location) = &search.location {
                line.push_str(&format!(", {}", location));
            }
            line
        })
        .collect()
}

fn render_top_games(games: &[TopGame]) -> Vec<String> {
    if games.is_empty() {
        return vec!["Noch keine Ausleihen.".to_string()];
    }

    games
        .iter()
        .enumerate()
        .map(|(rank, game)| format!("  {:>2}. {} ({}x)", rank + 1, game.title, game.times_borrowed))
        .collect()
}

/// `[#####-----]` style countdown bar
pub fn progress_bar(fraction: f64, width: usize) -> String {
    let inner = width.saturating_sub(2);
    let filled = ((fraction.clamp(0.0, 1.0) * inner as f64).round() as usize).min(inner);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(inner - filled))
}

/// Full screen: slide header, body, countdown, prompt, notifications, status
pub fn render_frame(view: &KioskView, state: &AppState, now: Instant, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    match view.current() {
        Some(slide) => {
            lines.push(format!(
                "SpielViel | {} ({}/{})",
                slide.id.title(),
                view.index + 1,
                view.slides.len()
            ));
            lines.push(String::new());
            lines.extend(render_slide(slide));
            lines.push(String::new());
            lines.push(progress_bar(view.progress(now), width.max(3)));
        }
        None => lines.push("SpielViel | Daten werden geladen...".to_string()),
    }

    if let Some(game) = &state.pending_prompt {
        lines.push(String::new());
        lines.push(format!(
            "{}: {} von {} Exemplaren verliehen. [b] ausleihen  [r] zurückgeben  [Esc] abbrechen",
            game.title,
            game.borrowed_copies(),
            game.total_copies
        ));
    }

    for notification in &state.notifications {
        let marker = match notification.level {
            NotificationLevel::Info => "+",
            NotificationLevel::Error => "!",
        };
        lines.push(format!("{} {}", marker, notification.message));
    }

    let scanner = if state.scanning_enabled { "bereit" } else { "pausiert" };
    let last = state.last_scan.as_deref().unwrap_or("-");
    lines.push(format!("Scanner: {} | Letzter Scan: {}", scanner, last));

    lines
}
