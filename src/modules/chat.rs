//! Chat rendering
//!
//! Builds the chat line the host shows for a player message: a DEAD tag for
//! non-participants, the player's stored prefix, and a hover text with their
//! match kills and deaths.

use std::sync::Arc;

use uuid::Uuid;

use super::prefix::PrefixModule;

/// A fully rendered chat message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChat {
    pub line: String,
    /// Shown when hovering the sender's name
    pub hover: String,
}

#[derive(Clone)]
pub struct ChatModule {
    prefix: Arc<PrefixModule>,
}

impl ChatModule {
    pub fn new(prefix: Arc<PrefixModule>) -> Self {
        Self { prefix }
    }

    pub fn render(
        &self,
        sender: Uuid,
        name: &str,
        is_participant: bool,
        kills: u64,
        deaths: u64,
        message: &str,
    ) -> RenderedChat {
        let mut line = String::new();
        if !is_participant {
            line.push_str("DEAD ");
        }
        if let Some(prefix) = self.prefix.get(sender) {
            line.push('[');
            line.push_str(&prefix);
            line.push_str("] ");
        }
        line.push_str(name);
        line.push_str(": ");
        line.push_str(message);

        RenderedChat {
            line,
            hover: format!("Kills: {}\nDeaths: {}", kills, deaths),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::host::api::HostApiClient;
    use crate::host::data::DataStoreClient;

    fn chat() -> (ChatModule, Arc<PrefixModule>) {
        let config = Config {
            log_level: "info".into(),
            host_api_url: "http://localhost".into(),
            host_api_key: "test".into(),
            assets_dir: "assets/configs".into(),
            world_templates_dir: "assets/world-templates".into(),
            world_bucket: "DemoWorlds".into(),
            min_players: 2,
            shrink_time_rate: 60,
            shrink_time_player_rate: 24,
            min_border_radius: 10,
            local_testing: true,
        };
        let prefix = PrefixModule::new(DataStoreClient::new(HostApiClient::new(&config)), true);
        (ChatModule::new(Arc::clone(&prefix)), prefix)
    }

    #[test]
    fn participant_line_has_no_dead_tag() {
        let (chat, prefix) = chat();
        let sender = Uuid::new_v4();
        prefix.set(sender, "MVP".to_string());

        let rendered = chat.render(sender, "Alex", true, 2, 1, "hello");

        assert_eq!(rendered.line, "[MVP] Alex: hello");
        assert_eq!(rendered.hover, "Kills: 2\nDeaths: 1");
    }

    #[test]
    fn spectator_line_is_tagged_dead() {
        let (chat, _prefix) = chat();
        let rendered = chat.render(Uuid::new_v4(), "Sam", false, 0, 3, "gg");
        assert_eq!(rendered.line, "DEAD Sam: gg");
    }
}
