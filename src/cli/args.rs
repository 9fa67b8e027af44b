use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "waqt", version, author, about = "Today's prayer times and a live countdown to the next one")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Show today's prayer times and countdown to next prayer
    Times {
        /// Only show this prayer (fajr, dhuhr/zuhr, asr, maghrib, isha)
        prayer: Option<String>,
    },
    /// Fetch today's timings now, ignoring the cache age
    Refresh,
    /// Show the config file location and effective settings
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_subcommand_opens_the_dashboard() {
        let cli = Cli::try_parse_from(["waqt"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["waqt", "times"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Times { prayer: None }));

        let cli = Cli::try_parse_from(["waqt", "times", "zuhr"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Commands::Times {
                prayer: Some("zuhr".to_string())
            })
        );

        let cli = Cli::try_parse_from(["waqt", "config", "--init"]).unwrap();
        assert_eq!(cli.command, Some(Commands::Config { init: true }));
    }

    #[test]
    fn rejects_unknown_subcommands() {
        assert!(Cli::try_parse_from(["waqt", "mark", "fajr"]).is_err());
    }
}
