use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::{
    bitflags_with_display,
    log,
    utils::hash::{self, PreHashedKeyMap, StringHash},
};

// ----------------------------------------------
// TerrainTags
// ----------------------------------------------

bitflags_with_display! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
    pub struct TerrainTags: u8 {
        const Liquid = 1 << 0; // Traversable by swimming.
        const Deep   = 1 << 1; // Swim-only; walkers cannot wade through.
        const Salt   = 1 << 2;
        const Fresh  = 1 << 3;
        const Road   = 1 << 4;
    }
}

// ----------------------------------------------
// TerrainDef
// ----------------------------------------------

// Swim path cost for Liquid terrains that don't configure their own.
pub const DEFAULT_SWIM_COST: i32 = 15;

#[derive(Clone, Serialize, Deserialize)]
pub struct TerrainDef {
    pub name: String,

    #[serde(skip)]
    pub name_hash: StringHash,

    pub tags: TerrainTags,
    pub passable: bool,

    // Static movement cost added for stepping onto this terrain.
    pub path_cost: i32,

    // Replaces `path_cost` for swimming agents. Liquid terrain without a
    // configured value falls back to a 90% discount on `path_cost`.
    #[serde(default)]
    pub swim_cost: Option<i32>,

    // Avoidance surcharges applied on top of `path_cost` for walkers.
    // Skipped entirely while swimming.
    #[serde(default)]
    pub perceived_cost_commanded: i32,
    #[serde(default)]
    pub perceived_cost_free: i32,
}

impl TerrainDef {
    pub fn new(name: &str, tags: TerrainTags, passable: bool, path_cost: i32) -> Self {
        Self {
            name: name.to_string(),
            name_hash: hash::fnv1a_from_str(name),
            tags,
            passable,
            path_cost,
            swim_cost: None,
            perceived_cost_commanded: 0,
            perceived_cost_free: 0,
        }
    }

    pub fn with_swim_cost(mut self, swim_cost: i32) -> Self {
        self.swim_cost = Some(swim_cost);
        self
    }

    pub fn with_perceived_costs(mut self, commanded: i32, free: i32) -> Self {
        self.perceived_cost_commanded = commanded;
        self.perceived_cost_free = free;
        self
    }

    #[inline]
    pub fn is_liquid(&self) -> bool {
        self.tags.contains(TerrainTags::Liquid)
    }

    #[inline]
    pub fn is_deep(&self) -> bool {
        self.tags.contains(TerrainTags::Deep)
    }

    // Terrain cost contribution while swimming.
    #[inline]
    pub fn swim_cost_or_discounted(&self) -> i32 {
        self.swim_cost.unwrap_or(self.path_cost / 10)
    }

    #[inline]
    pub fn perceived_cost(&self, commanded: bool) -> i32 {
        if commanded {
            self.perceived_cost_commanded
        } else {
            self.perceived_cost_free
        }
    }
}

// ----------------------------------------------
// TerrainId
// ----------------------------------------------

// Index into the TerrainCatalog.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainId(pub u16);

// ----------------------------------------------
// TerrainCatalog
// ----------------------------------------------

pub struct TerrainCatalog {
    defs: Vec<TerrainDef>,
    defs_by_name: PreHashedKeyMap<StringHash, TerrainId>,
}

impl TerrainCatalog {
    pub fn new(defs: Vec<TerrainDef>) -> Self {
        debug_assert!(!defs.is_empty());
        debug_assert!(defs.len() <= u16::MAX as usize);

        let mut defs_by_name = PreHashedKeyMap::default();
        for (index, def) in defs.iter().enumerate() {
            debug_assert!(def.name_hash != hash::NULL_HASH);
            if defs_by_name.insert(def.name_hash, TerrainId(index as u16)).is_some() {
                log::error!(log::channel!("Terrain"), "Duplicate terrain def name: '{}'", def.name);
            }
        }

        Self { defs, defs_by_name }
    }

    // Built-in terrain set with the stock water bodies and their swim
    // costs. Deep water is passable but swim-only; ocean water is salt
    // tagged so aquatic agents can be constrained to fresh/salt water.
    pub fn with_defaults() -> Self {
        use TerrainTags as T;

        let fresh = T::Liquid | T::Fresh;
        let fresh_deep = T::Liquid | T::Fresh | T::Deep;
        let salt = T::Liquid | T::Salt;
        let salt_deep = T::Liquid | T::Salt | T::Deep;

        Self::new(vec![
            TerrainDef::new("soil", T::empty(), true, 0),
            TerrainDef::new("sand", T::empty(), true, 3),
            TerrainDef::new("gravel", T::empty(), true, 1),
            TerrainDef::new("stone_road", T::Road, true, 0),
            TerrainDef::new("rock_wall", T::empty(), false, 0),
            TerrainDef::new("marsh", fresh, true, 30)
                .with_swim_cost(30)
                .with_perceived_costs(10, 30),
            TerrainDef::new("water_shallow", fresh, true, 22)
                .with_swim_cost(15)
                .with_perceived_costs(10, 40),
            TerrainDef::new("water_moving_shallow", fresh, true, 25)
                .with_swim_cost(20)
                .with_perceived_costs(10, 40),
            TerrainDef::new("water_ocean_shallow", salt, true, 22)
                .with_swim_cost(15)
                .with_perceived_costs(10, 40),
            TerrainDef::new("water_deep", fresh_deep, true, 60)
                .with_swim_cost(10),
            TerrainDef::new("water_moving_chest_deep", fresh_deep, true, 60)
                .with_swim_cost(10),
            TerrainDef::new("water_ocean_deep", salt_deep, true, 60)
                .with_swim_cost(10),
        ])
    }

    #[inline]
    pub fn find(&self, name: &str) -> Option<TerrainId> {
        self.defs_by_name.get(&hash::fnv1a_from_str(name)).copied()
    }

    #[inline]
    pub fn def(&self, id: TerrainId) -> &TerrainDef {
        &self.defs[id.0 as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut defs: Vec<TerrainDef> = serde_json::from_str(json)?;
        for def in &mut defs {
            // Hashes are not serialized; recompute on load.
            def.name_hash = hash::fnv1a_from_str(&def.name);
        }
        Ok(Self::new(defs))
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.defs)
    }
}
