//! Player sessions owned by the host runtime

use std::collections::HashMap;

use dashmap::DashMap;
use uuid::Uuid;

use super::world::Position;

/// Player game mode as rendered by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    Survival,
    Adventure,
    Spectator,
}

/// Potion-style effects the game applies to sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EffectKind {
    Regeneration,
    Glowing,
    Invisibility,
}

/// Effect duration marker for "until explicitly removed"
pub const EFFECT_UNTIL_REMOVED: u32 = u32::MAX;

/// Item materials used by kits and loot tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Material {
    WoodenAxe,
    WoodenSword,
    StoneAxe,
    StoneSword,
    IronAxe,
    LeatherHelmet,
    LeatherChestplate,
    LeatherLeggings,
    LeatherBoots,
    GoldenHelmet,
    GoldenChestplate,
    GoldenLeggings,
    GoldenBoots,
    ChainmailHelmet,
    ChainmailChestplate,
    ChainmailLeggings,
    ChainmailBoots,
    IronHelmet,
    IronChestplate,
    IronLeggings,
    IronBoots,
    FishingRod,
    Snowball,
    Egg,
    Bow,
    Arrow,
    BakedPotato,
    CookedBeef,
    CookedChicken,
    Carrot,
    Wheat,
    Apple,
    Porkchop,
    MushroomStew,
    ExperienceBottle,
    Stick,
    OakBoat,
    IronIngot,
    GoldIngot,
    Flint,
    Feather,
    Diamond,
    TrackingCompass,
}

/// A stack of items in a session inventory
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ItemStack {
    pub material: Material,
    pub amount: u32,
    /// Remaining uses for limited-use items (tracking compass)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<u32>,
}

impl ItemStack {
    pub fn of(material: Material) -> Self {
        Self { material, amount: 1, uses: None }
    }
}

/// Worn equipment slots
#[derive(Debug, Clone, Default)]
pub struct Equipment {
    pub helmet: Option<Material>,
    pub chestplate: Option<Material>,
    pub leggings: Option<Material>,
    pub boots: Option<Material>,
    pub main_hand: Option<ItemStack>,
}

/// A connected player as the host runtime tracks it
#[derive(Debug, Clone)]
pub struct PlayerSession {
    pub id: Uuid,
    pub name: String,
    pub locale: String,
    pub position: Position,
    pub game_mode: GameMode,

    pub health: f32,
    pub max_health: f32,
    pub food_level: u32,
    pub fire_ticks: u32,
    pub fall_distance: f32,
    pub invulnerable: bool,

    pub inventory: Vec<ItemStack>,
    pub equipment: Equipment,
    /// Effects with remaining duration in ticks
    pub effects: HashMap<EffectKind, u32>,
    /// Ability markers granted by the active kit
    pub abilities: Vec<&'static str>,
    /// Team this session was assigned to for the current match
    pub team: Option<String>,

    /// Last session that damaged this one, for kill attribution
    pub last_damager: Option<Uuid>,
}

impl PlayerSession {
    pub fn new(id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            locale: "en_US".to_string(),
            position: Position::ORIGIN,
            game_mode: GameMode::Survival,
            health: 20.0,
            max_health: 20.0,
            food_level: 20,
            fire_ticks: 0,
            fall_distance: 0.0,
            invulnerable: false,
            inventory: Vec::new(),
            equipment: Equipment::default(),
            effects: HashMap::new(),
            abilities: Vec::new(),
            team: None,
            last_damager: None,
        }
    }

    pub fn has_ability(&self, name: &str) -> bool {
        self.abilities.iter().any(|a| *a == name)
    }

    pub fn add_effect(&mut self, kind: EffectKind, duration_ticks: u32) {
        self.effects.insert(kind, duration_ticks);
    }

    pub fn remove_effect(&mut self, kind: EffectKind) {
        self.effects.remove(&kind);
    }

    pub fn teleport(&mut self, position: Position) {
        self.position = position;
    }

    /// Reset inventory, health, effects, etc. between matches
    pub fn cleanup(&mut self) {
        self.inventory.clear();
        self.equipment = Equipment::default();
        self.effects.clear();
        self.health = self.max_health;
        self.food_level = 20;
        self.fire_ticks = 0;
        self.fall_distance = 0.0;
        self.invulnerable = false;
        self.last_damager = None;
    }
}

/// Registry of all connected sessions
///
/// Mutated only from the single match task; the map itself is shared so the
/// host bridge can insert/remove sessions as connections come and go.
#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<Uuid, PlayerSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self { sessions: DashMap::new() }
    }

    pub fn insert(&self, session: PlayerSession) {
        self.sessions.insert(session.id, session);
    }

    pub fn remove(&self, id: Uuid) -> Option<PlayerSession> {
        self.sessions.remove(&id).map(|(_, s)| s)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn online_ids(&self) -> Vec<Uuid> {
        self.sessions.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Read a session field through a closure
    pub fn read<R>(&self, id: Uuid, f: impl FnOnce(&PlayerSession) -> R) -> Option<R> {
        self.sessions.get(&id).map(|s| f(&s))
    }

    /// Mutate a session through a closure
    pub fn update<R>(&self, id: Uuid, f: impl FnOnce(&mut PlayerSession) -> R) -> Option<R> {
        self.sessions.get_mut(&id).map(|mut s| f(&mut s))
    }

    pub fn name_of(&self, id: Uuid) -> Option<String> {
        self.read(id, |s| s.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_resets_session_state() {
        let mut session = PlayerSession::new(Uuid::new_v4(), "tester");
        session.health = 3.0;
        session.food_level = 2;
        session.inventory.push(ItemStack::of(Material::StoneSword));
        session.add_effect(EffectKind::Glowing, 100);
        session.last_damager = Some(Uuid::new_v4());

        session.cleanup();

        assert_eq!(session.health, session.max_health);
        assert_eq!(session.food_level, 20);
        assert!(session.inventory.is_empty());
        assert!(session.effects.is_empty());
        assert!(session.last_damager.is_none());
    }

    #[test]
    fn registry_tracks_connections() {
        let registry = SessionRegistry::new();
        assert!(registry.is_empty());

        let id = Uuid::new_v4();
        registry.insert(PlayerSession::new(id, "tester"));
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        let removed = registry.remove(id).unwrap();
        assert_eq!(removed.name, "tester");
        assert!(!registry.contains(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn registry_update_reaches_session() {
        let registry = SessionRegistry::new();
        let id = Uuid::new_v4();
        registry.insert(PlayerSession::new(id, "tester"));

        registry.update(id, |s| s.game_mode = GameMode::Spectator);

        assert_eq!(registry.read(id, |s| s.game_mode), Some(GameMode::Spectator));
    }
}
