//! Chest loot tables
//!
//! Two tiers of chests, each driven by a JSON table under the assets
//! directory. A table is a list of pools; filling a container rolls every
//! pool independently, picking weighted items. Missing table files are a
//! fatal setup error so a match never silently runs with empty chests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::host::session::{ItemStack, Material};
use crate::host::world::Position;
use crate::util::time::unix_millis;

/// Inclusive item-count range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmountRange {
    pub min: u32,
    pub max: u32,
}

impl AmountRange {
    pub fn single() -> Self {
        Self { min: 1, max: 1 }
    }

    pub fn between(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn roll(&self, rng: &mut impl Rng) -> u32 {
        if self.min >= self.max {
            self.min
        } else {
            rng.gen_range(self.min..=self.max)
        }
    }
}

impl Default for AmountRange {
    fn default() -> Self {
        Self::single()
    }
}

/// One weighted item inside a pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedItem {
    pub weight: u32,
    pub material: Material,
    #[serde(default)]
    pub amount: AmountRange,
    /// Remaining uses for limited-use items
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uses: Option<u32>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unbreakable: bool,
}

impl WeightedItem {
    fn of(weight: u32, material: Material) -> Self {
        Self { weight, material, amount: AmountRange::single(), uses: None, unbreakable: false }
    }

    fn unbreakable(weight: u32, material: Material) -> Self {
        Self { unbreakable: true, ..Self::of(weight, material) }
    }

    fn ranged(weight: u32, material: Material, min: u32, max: u32) -> Self {
        Self { amount: AmountRange::between(min, max), ..Self::of(weight, material) }
    }
}

/// A pool of weighted items; each fill draws `rolls` items from it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootPool {
    #[serde(default)]
    pub rolls: AmountRange,
    pub items: Vec<WeightedItem>,
}

impl LootPool {
    /// Weighted pick of one item from this pool
    fn pick(&self, rng: &mut impl Rng) -> Option<&WeightedItem> {
        let total: u64 = self.items.iter().map(|i| i.weight as u64).sum();
        if total == 0 {
            return None;
        }
        let mut roll = rng.gen_range(0..total);
        for item in &self.items {
            if roll < item.weight as u64 {
                return Some(item);
            }
            roll -= item.weight as u64;
        }
        None
    }
}

/// When a chest becomes eligible for a refill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CooldownMode {
    /// Each container refills independently
    Container,
    /// One cooldown shared by every container of the tier
    Type,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RefillPolicy {
    pub mode: CooldownMode,
    pub refill_secs: u32,
}

/// One tier's loot table as stored on disk
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LootTable {
    pub name: String,
    pub refill: RefillPolicy,
    pub pools: Vec<LootPool>,
}

impl LootTable {
    /// Roll a full container's worth of loot
    pub fn fill(&self, rng: &mut impl Rng) -> Vec<ItemStack> {
        let mut out = Vec::new();
        for pool in &self.pools {
            let rolls = pool.rolls.roll(rng);
            for _ in 0..rolls {
                if let Some(item) = pool.pick(rng) {
                    out.push(ItemStack {
                        material: item.material,
                        amount: item.amount.roll(rng),
                        uses: item.uses,
                    });
                }
            }
        }
        out
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LootError {
    #[error("Failed to read loot table {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("Failed to parse loot table {path}: {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("Failed to write loot table {path}: {source}")]
    Write { path: PathBuf, source: std::io::Error },
}

/// Chest tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LootTier {
    Tier1,
    Tier2,
}

impl LootTier {
    pub fn file_name(self) -> &'static str {
        match self {
            LootTier::Tier1 => "tier1.json",
            LootTier::Tier2 => "tier2.json",
        }
    }
}

/// Container key used for refill bookkeeping
fn container_key(position: Position) -> (i64, i64, i64) {
    (position.x as i64, position.y as i64, position.z as i64)
}

/// Per-match loot state: the two tier tables plus refill cooldowns
pub struct LootMechanic {
    tier1: LootTable,
    tier2: LootTable,
    /// Last fill time per container (Container mode)
    container_fills: HashMap<(i64, i64, i64), u64>,
    /// Last fill time per tier (Type mode)
    tier_fills: HashMap<LootTier, u64>,
}

impl LootMechanic {
    /// Load both tier tables from the assets directory; any failure is fatal
    pub fn load(assets_dir: &Path) -> Result<Self, LootError> {
        Ok(Self {
            tier1: read_table(&assets_dir.join(LootTier::Tier1.file_name()))?,
            tier2: read_table(&assets_dir.join(LootTier::Tier2.file_name()))?,
            container_fills: HashMap::new(),
            tier_fills: HashMap::new(),
        })
    }

    pub fn table(&self, tier: LootTier) -> &LootTable {
        match tier {
            LootTier::Tier1 => &self.tier1,
            LootTier::Tier2 => &self.tier2,
        }
    }

    /// Whether a container at `position` should be (re)filled when opened now
    pub fn should_fill(&self, tier: LootTier, position: Position) -> bool {
        self.should_fill_at(tier, position, unix_millis())
    }

    fn should_fill_at(&self, tier: LootTier, position: Position, now: u64) -> bool {
        let policy = self.table(tier).refill;
        let cooldown_millis = policy.refill_secs as u64 * 1_000;
        let last = match policy.mode {
            CooldownMode::Container => self.container_fills.get(&container_key(position)),
            CooldownMode::Type => self.tier_fills.get(&tier),
        };
        match last {
            Some(at) => now.saturating_sub(*at) >= cooldown_millis,
            None => true,
        }
    }

    /// Roll loot for a container and start its refill cooldown
    pub fn fill(&mut self, tier: LootTier, position: Position, rng: &mut impl Rng) -> Vec<ItemStack> {
        self.fill_at(tier, position, rng, unix_millis())
    }

    fn fill_at(
        &mut self,
        tier: LootTier,
        position: Position,
        rng: &mut impl Rng,
        now: u64,
    ) -> Vec<ItemStack> {
        match self.table(tier).refill.mode {
            CooldownMode::Container => {
                self.container_fills.insert(container_key(position), now);
            }
            CooldownMode::Type => {
                self.tier_fills.insert(tier, now);
            }
        }
        self.table(tier).fill(rng)
    }

    /// Reset refill state between matches
    pub fn reset(&mut self) {
        self.container_fills.clear();
        self.tier_fills.clear();
    }
}

fn read_table(path: &Path) -> Result<LootTable, LootError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| LootError::Read { path: path.to_path_buf(), source: e })?;
    serde_json::from_str(&raw).map_err(|e| LootError::Parse { path: path.to_path_buf(), source: e })
}

/// Write the stock tier tables into `assets_dir`, skipping files that exist
pub fn write_default_tables(assets_dir: &Path) -> Result<(), LootError> {
    std::fs::create_dir_all(assets_dir)
        .map_err(|e| LootError::Write { path: assets_dir.to_path_buf(), source: e })?;
    for (tier, table) in [
        (LootTier::Tier1, default_tier1()),
        (LootTier::Tier2, default_tier2()),
    ] {
        let path = assets_dir.join(tier.file_name());
        if path.exists() {
            continue;
        }
        let json = serde_json::to_string_pretty(&table)
            .map_err(|e| LootError::Parse { path: path.clone(), source: e })?;
        std::fs::write(&path, json).map_err(|e| LootError::Write { path, source: e })?;
    }
    Ok(())
}

fn default_tier1() -> LootTable {
    LootTable {
        name: "Tier-1".to_string(),
        refill: RefillPolicy { mode: CooldownMode::Container, refill_secs: 25 },
        pools: vec![
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::unbreakable(240, Material::WoodenAxe),
                    WeightedItem::unbreakable(210, Material::WoodenSword),
                    WeightedItem::unbreakable(180, Material::StoneAxe),
                    WeightedItem::unbreakable(100, Material::StoneSword),
                ],
            },
            LootPool {
                rolls: AmountRange::between(1, 2),
                items: vec![
                    WeightedItem::unbreakable(100, Material::LeatherHelmet),
                    WeightedItem::unbreakable(100, Material::LeatherChestplate),
                    WeightedItem::of(100, Material::LeatherLeggings),
                    WeightedItem::unbreakable(100, Material::LeatherBoots),
                    WeightedItem::unbreakable(75, Material::GoldenHelmet),
                    WeightedItem::unbreakable(75, Material::GoldenChestplate),
                    WeightedItem::unbreakable(75, Material::GoldenLeggings),
                    WeightedItem::unbreakable(75, Material::GoldenBoots),
                    WeightedItem::unbreakable(30, Material::ChainmailHelmet),
                    WeightedItem::unbreakable(30, Material::ChainmailChestplate),
                    WeightedItem::unbreakable(30, Material::ChainmailLeggings),
                    WeightedItem::unbreakable(30, Material::ChainmailBoots),
                ],
            },
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::of(100, Material::FishingRod),
                    WeightedItem::ranged(100, Material::Snowball, 1, 2),
                    WeightedItem::ranged(100, Material::Egg, 1, 2),
                    WeightedItem::of(60, Material::Bow),
                    WeightedItem::ranged(60, Material::Arrow, 1, 2),
                ],
            },
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::ranged(100, Material::BakedPotato, 1, 3),
                    WeightedItem::ranged(100, Material::CookedBeef, 1, 2),
                    WeightedItem::ranged(100, Material::CookedChicken, 1, 3),
                    WeightedItem::ranged(100, Material::Carrot, 1, 3),
                    WeightedItem::ranged(100, Material::Wheat, 1, 3),
                    WeightedItem::ranged(100, Material::Apple, 1, 3),
                    WeightedItem::ranged(100, Material::Porkchop, 1, 3),
                    WeightedItem::of(80, Material::MushroomStew),
                ],
            },
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::ranged(100, Material::ExperienceBottle, 1, 2),
                    WeightedItem::ranged(100, Material::Stick, 1, 2),
                    WeightedItem {
                        uses: Some(5),
                        ..WeightedItem::of(100, Material::TrackingCompass)
                    },
                    WeightedItem::of(50, Material::OakBoat),
                    WeightedItem::ranged(45, Material::IronIngot, 1, 2),
                    WeightedItem::ranged(45, Material::GoldIngot, 1, 2),
                    WeightedItem::ranged(35, Material::Flint, 1, 2),
                    WeightedItem::ranged(35, Material::Feather, 1, 2),
                ],
            },
        ],
    }
}

fn default_tier2() -> LootTable {
    LootTable {
        name: "Tier-2".to_string(),
        refill: RefillPolicy { mode: CooldownMode::Type, refill_secs: 15 },
        pools: vec![
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::unbreakable(240, Material::WoodenAxe),
                    WeightedItem::unbreakable(210, Material::WoodenSword),
                    WeightedItem::unbreakable(180, Material::StoneAxe),
                    WeightedItem::unbreakable(100, Material::StoneSword),
                    WeightedItem::unbreakable(100, Material::IronAxe),
                ],
            },
            LootPool {
                rolls: AmountRange::between(1, 2),
                items: vec![
                    WeightedItem::unbreakable(100, Material::LeatherHelmet),
                    WeightedItem::unbreakable(100, Material::LeatherChestplate),
                    WeightedItem::of(100, Material::LeatherLeggings),
                    WeightedItem::unbreakable(100, Material::LeatherBoots),
                    WeightedItem::unbreakable(75, Material::GoldenHelmet),
                    WeightedItem::unbreakable(75, Material::GoldenChestplate),
                    WeightedItem::unbreakable(75, Material::GoldenLeggings),
                    WeightedItem::unbreakable(75, Material::GoldenBoots),
                    WeightedItem::unbreakable(75, Material::ChainmailHelmet),
                    WeightedItem::unbreakable(75, Material::ChainmailChestplate),
                    WeightedItem::unbreakable(75, Material::ChainmailLeggings),
                    WeightedItem::unbreakable(75, Material::ChainmailBoots),
                    WeightedItem::unbreakable(25, Material::IronHelmet),
                    WeightedItem::unbreakable(25, Material::IronChestplate),
                    WeightedItem::unbreakable(25, Material::IronLeggings),
                    WeightedItem::unbreakable(25, Material::IronBoots),
                ],
            },
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::of(100, Material::FishingRod),
                    WeightedItem::ranged(100, Material::Snowball, 1, 2),
                    WeightedItem::ranged(100, Material::Egg, 1, 2),
                    WeightedItem::of(50, Material::Bow),
                    WeightedItem::ranged(50, Material::Arrow, 1, 2),
                ],
            },
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::ranged(100, Material::BakedPotato, 1, 3),
                    WeightedItem::ranged(100, Material::CookedBeef, 1, 2),
                    WeightedItem::ranged(100, Material::CookedChicken, 1, 3),
                    WeightedItem::ranged(100, Material::Carrot, 1, 3),
                    WeightedItem::ranged(100, Material::Wheat, 1, 3),
                    WeightedItem::ranged(100, Material::Apple, 1, 3),
                    WeightedItem::ranged(100, Material::Porkchop, 1, 3),
                    WeightedItem::of(80, Material::MushroomStew),
                ],
            },
            LootPool {
                rolls: AmountRange::single(),
                items: vec![
                    WeightedItem::ranged(100, Material::ExperienceBottle, 1, 2),
                    WeightedItem::ranged(100, Material::Stick, 1, 2),
                    WeightedItem {
                        uses: Some(5),
                        ..WeightedItem::of(100, Material::TrackingCompass)
                    },
                    WeightedItem::of(80, Material::GoldIngot),
                    WeightedItem::ranged(70, Material::Flint, 1, 2),
                    WeightedItem::ranged(70, Material::Feather, 1, 2),
                    WeightedItem::ranged(50, Material::IronIngot, 1, 2),
                    WeightedItem::of(50, Material::Diamond),
                    WeightedItem::of(50, Material::OakBoat),
                ],
            },
        ],
    }
}
