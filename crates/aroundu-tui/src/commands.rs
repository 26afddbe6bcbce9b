//! Slash-command parsing.
//!
//! Everything typed into the input line goes through [`parse`]. Lines that
//! do not start with `/` are chat messages.

use aroundu_core::location::RADIUS_PRESETS;

/// Help text listing every command.
pub const HELP: &str = "/locate LAT LON  /radius M  /profile NAME [GENDER] [INTEREST]  /match  \
                        /refresh  /chat [N]  /accept  /decline  /leave  /quit";

/// A parsed input line.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Register a location.
    Locate {
        /// Latitude in degrees.
        lat: f64,
        /// Longitude in degrees.
        lon: f64,
    },
    /// Pick the discovery radius for the next registration.
    Radius {
        /// Radius in meters, one of the presets.
        meters: u32,
    },
    /// Submit the profile.
    Profile {
        /// Display name.
        username: String,
        /// Self-declared gender.
        gender: String,
        /// Matching preference.
        interest: String,
    },
    /// Ask to be matched.
    Match,
    /// Fetch a fresh nearby list.
    Refresh,
    /// Invite a nearby user. `None` invites the highlighted one.
    Chat {
        /// 1-based position in the nearby list.
        position: Option<usize>,
    },
    /// Accept the pending request.
    Accept,
    /// Decline the pending request.
    Decline,
    /// Leave the current room.
    Leave,
    /// Show the command list.
    Help,
    /// Exit.
    Quit,
    /// Plain text.
    Message {
        /// The line as typed.
        text: String,
    },
    /// Unrecognized command.
    Unknown {
        /// The line as typed.
        input: String,
    },
    /// Known command with bad arguments.
    InvalidArgs {
        /// Command name without the slash.
        command: &'static str,
        /// What was wrong.
        error: String,
    },
}

/// Parse one input line.
pub fn parse(input: &str) -> Command {
    let trimmed = input.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Message { text: input.to_string() };
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match name {
        "locate" => parse_locate(&args),
        "radius" => parse_radius(&args),
        "profile" => parse_profile(&args),
        "match" => Command::Match,
        "refresh" => Command::Refresh,
        "chat" => parse_chat(&args),
        "accept" => Command::Accept,
        "decline" => Command::Decline,
        "leave" => Command::Leave,
        "help" => Command::Help,
        "quit" | "q" => Command::Quit,
        _ => Command::Unknown { input: trimmed.to_string() },
    }
}

fn parse_locate(args: &[&str]) -> Command {
    let invalid = |error: &str| Command::InvalidArgs { command: "locate", error: error.into() };
    let [lat, lon] = args else {
        return invalid("usage: /locate LAT LON");
    };
    match (lat.parse::<f64>(), lon.parse::<f64>()) {
        (Ok(lat), Ok(lon)) => Command::Locate { lat, lon },
        _ => invalid("coordinates must be numbers"),
    }
}

fn parse_radius(args: &[&str]) -> Command {
    let invalid = || Command::InvalidArgs {
        command: "radius",
        error: format!("choose one of {RADIUS_PRESETS:?}"),
    };
    match args {
        [meters] => match meters.parse::<u32>() {
            Ok(meters) if RADIUS_PRESETS.contains(&meters) => Command::Radius { meters },
            _ => invalid(),
        },
        _ => invalid(),
    }
}

fn parse_profile(args: &[&str]) -> Command {
    match args {
        [] => Command::InvalidArgs {
            command: "profile",
            error: "usage: /profile NAME [GENDER] [INTEREST]".into(),
        },
        [username, rest @ ..] => Command::Profile {
            username: (*username).to_string(),
            gender: rest.first().copied().unwrap_or("other").to_string(),
            interest: rest.get(1).copied().unwrap_or("any").to_string(),
        },
    }
}

fn parse_chat(args: &[&str]) -> Command {
    match args {
        [] => Command::Chat { position: None },
        [n] => match n.parse::<usize>() {
            Ok(position) if position > 0 => Command::Chat { position: Some(position) },
            _ => Command::InvalidArgs { command: "chat", error: format!("invalid position: {n}") },
        },
        _ => Command::InvalidArgs { command: "chat", error: "usage: /chat [N]".into() },
    }
}
