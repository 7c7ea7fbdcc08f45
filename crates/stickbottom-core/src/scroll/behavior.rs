//! L4 Atomic Layer: Animation parameter resolution
//!
//! Merges requested animation behaviors with configured defaults. Resolved
//! spring triples are interned so that identical parameters share one
//! allocation, which lets the animator compare behaviors by identity.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Spring used when nothing overrides it.
pub const DEFAULT_SPRING: SpringParams = SpringParams {
    damping: 0.7,
    stiffness: 0.05,
    mass: 1.25,
};

/// Fully populated spring parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringParams {
    pub damping: f64,
    pub stiffness: f64,
    pub mass: f64,
}

impl SpringParams {
    /// Express these parameters as a request that overrides every field
    pub fn overrides(&self) -> SpringOverrides {
        SpringOverrides {
            damping: Some(self.damping),
            stiffness: Some(self.stiffness),
            mass: Some(self.mass),
        }
    }

    fn cache_key(&self) -> [u64; 3] {
        [
            self.damping.to_bits(),
            self.stiffness.to_bits(),
            self.mass.to_bits(),
        ]
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        DEFAULT_SPRING
    }
}

/// Partial spring parameters; `None` keeps the value from earlier sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SpringOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub damping: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stiffness: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f64>,
}

impl SpringOverrides {
    pub fn is_empty(&self) -> bool {
        self.damping.is_none() && self.stiffness.is_none() && self.mass.is_none()
    }

    fn apply_to(&self, params: &mut SpringParams) {
        if let Some(damping) = self.damping {
            params.damping = damping;
        }
        if let Some(stiffness) = self.stiffness {
            params.stiffness = stiffness;
        }
        if let Some(mass) = self.mass {
            params.mass = mass;
        }
    }
}

/// A requested animation behavior
///
/// In configuration files this is either the string `"instant"` or a table
/// such as `{ damping = 0.8, mass = 1.0 }`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnimationRequest {
    /// Jump straight to the target
    Instant,
    /// Spring towards the target, overriding some parameters
    Spring(SpringOverrides),
}

impl Default for AnimationRequest {
    fn default() -> Self {
        AnimationRequest::Spring(SpringOverrides::default())
    }
}

impl From<SpringOverrides> for AnimationRequest {
    fn from(overrides: SpringOverrides) -> Self {
        AnimationRequest::Spring(overrides)
    }
}

impl From<&ResolvedBehavior> for AnimationRequest {
    fn from(behavior: &ResolvedBehavior) -> Self {
        match behavior {
            ResolvedBehavior::Instant => AnimationRequest::Instant,
            ResolvedBehavior::Spring(params) => AnimationRequest::Spring(params.overrides()),
        }
    }
}

const INSTANT: &str = "instant";

fn instant_from_str<E: de::Error>(value: &str) -> Result<AnimationRequest, E> {
    if value.eq_ignore_ascii_case(INSTANT) {
        Ok(AnimationRequest::Instant)
    } else {
        Err(E::invalid_value(de::Unexpected::Str(value), &"\"instant\""))
    }
}

fn overrides_from_map<'de, M: MapAccess<'de>>(mut map: M) -> Result<SpringOverrides, M::Error> {
    let mut overrides = SpringOverrides::default();
    while let Some(key) = map.next_key::<String>()? {
        match key.as_str() {
            "damping" => overrides.damping = Some(map.next_value()?),
            "stiffness" => overrides.stiffness = Some(map.next_value()?),
            "mass" => overrides.mass = Some(map.next_value()?),
            _ => {
                // Ignore unknown fields
                let _: de::IgnoredAny = map.next_value()?;
            }
        }
    }
    Ok(overrides)
}

impl Serialize for AnimationRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnimationRequest::Instant => serializer.serialize_str(INSTANT),
            AnimationRequest::Spring(overrides) => overrides.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AnimationRequest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RequestVisitor;

        impl<'de> Visitor<'de> for RequestVisitor {
            type Value = AnimationRequest;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("\"instant\" or a map with damping, stiffness and mass")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<AnimationRequest, E> {
                instant_from_str(value)
            }

            fn visit_map<M: MapAccess<'de>>(self, map: M) -> Result<AnimationRequest, M::Error> {
                overrides_from_map(map).map(AnimationRequest::Spring)
            }
        }

        deserializer.deserialize_any(RequestVisitor)
    }
}

/// Behavior of the scroll issued for the very first content observation
///
/// `false` keeps the view unpinned until something requests a scroll,
/// `true` pins with the default spring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InitialScroll {
    Enabled(bool),
    Animation(AnimationRequest),
}

impl InitialScroll {
    /// Whether the engine starts out pinned to the bottom
    pub fn starts_at_bottom(&self) -> bool {
        !matches!(self, InitialScroll::Enabled(false))
    }

    pub fn request(&self) -> Option<&AnimationRequest> {
        match self {
            InitialScroll::Enabled(_) => None,
            InitialScroll::Animation(request) => Some(request),
        }
    }
}

impl Default for InitialScroll {
    fn default() -> Self {
        InitialScroll::Enabled(true)
    }
}

impl Serialize for InitialScroll {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            InitialScroll::Enabled(enabled) => serializer.serialize_bool(*enabled),
            InitialScroll::Animation(request) => request.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for InitialScroll {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct InitialVisitor;

        impl<'de> Visitor<'de> for InitialVisitor {
            type Value = InitialScroll;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a boolean, \"instant\" or a spring map")
            }

            fn visit_bool<E: de::Error>(self, value: bool) -> Result<InitialScroll, E> {
                Ok(InitialScroll::Enabled(value))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<InitialScroll, E> {
                instant_from_str(value).map(InitialScroll::Animation)
            }

            fn visit_map<M: MapAccess<'de>>(self, map: M) -> Result<InitialScroll, M::Error> {
                overrides_from_map(map)
                    .map(|overrides| InitialScroll::Animation(AnimationRequest::Spring(overrides)))
            }
        }

        deserializer.deserialize_any(InitialVisitor)
    }
}

/// Outcome of merging animation requests
#[derive(Debug, Clone)]
pub enum ResolvedBehavior {
    Instant,
    /// Interned parameters; equal triples share the same `Rc`
    Spring(Rc<SpringParams>),
}

impl ResolvedBehavior {
    pub fn is_instant(&self) -> bool {
        matches!(self, ResolvedBehavior::Instant)
    }

    /// Identity comparison. Two springs are the same only when they come
    /// from the same resolver cache entry.
    pub fn is_same(&self, other: &ResolvedBehavior) -> bool {
        match (self, other) {
            (ResolvedBehavior::Instant, ResolvedBehavior::Instant) => true,
            (ResolvedBehavior::Spring(a), ResolvedBehavior::Spring(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Merges requests and interns the resulting spring parameters
#[derive(Debug, Default)]
pub struct BehaviorResolver {
    cache: HashMap<[u64; 3], Rc<SpringParams>>,
}

impl BehaviorResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `sources` left to right on top of [`DEFAULT_SPRING`].
    ///
    /// `Instant` discards the overrides gathered so far and marks the
    /// result instant; a later spring source clears that mark again.
    pub fn resolve<'a, I>(&mut self, sources: I) -> ResolvedBehavior
    where
        I: IntoIterator<Item = Option<&'a AnimationRequest>>,
    {
        let mut params = DEFAULT_SPRING;
        let mut instant = false;

        for source in sources.into_iter().flatten() {
            match source {
                AnimationRequest::Instant => {
                    params = DEFAULT_SPRING;
                    instant = true;
                }
                AnimationRequest::Spring(overrides) => {
                    instant = false;
                    overrides.apply_to(&mut params);
                }
            }
        }

        if instant {
            return ResolvedBehavior::Instant;
        }

        let shared = self
            .cache
            .entry(params.cache_key())
            .or_insert_with(|| Rc::new(params))
            .clone();
        ResolvedBehavior::Spring(shared)
    }

    /// Number of distinct spring triples handed out so far
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}
