use crate::geometry::array::{dot, ArrayGeometry};
use crate::prelude::Direction;
use ndarray::Array1;
use num_complex::Complex64;
use std::collections::{HashMap, VecDeque};
use std::f64::consts::PI;
use std::sync::Mutex;

type SteeringKey = (u64, u64, u64);

fn key(direction: Direction, frequency: f64) -> SteeringKey {
    (
        direction.azimuth_deg.to_bits(),
        direction.elevation_deg.to_bits(),
        frequency.to_bits(),
    )
}

/// Bounded steering-vector memo with first-in first-out eviction.
///
/// Shared between calls through a mutex; a poisoned lock degrades to plain
/// recomputation.
pub struct SteeringCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
}

struct CacheInner {
    entries: HashMap<SteeringKey, Array1<Complex64>>,
    order: VecDeque<SteeringKey>,
    hits: u64,
    misses: u64,
}

impl SteeringCache {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(capacity),
                order: VecDeque::with_capacity(capacity),
                hits: 0,
                misses: 0,
            }),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn get(&self, key: &SteeringKey) -> Option<Array1<Complex64>> {
        let mut inner = self.inner.lock().ok()?;
        match inner.entries.get(key).cloned() {
            Some(vector) => {
                inner.hits += 1;
                Some(vector)
            }
            None => {
                inner.misses += 1;
                None
            }
        }
    }

    fn insert(&self, key: SteeringKey, vector: Array1<Complex64>) {
        if self.capacity == 0 {
            return;
        }
        if let Ok(mut inner) = self.inner.lock() {
            if inner.entries.contains_key(&key) {
                return;
            }
            while inner.order.len() >= self.capacity {
                match inner.order.pop_front() {
                    Some(oldest) => {
                        inner.entries.remove(&oldest);
                    }
                    None => break,
                }
            }
            inner.order.push_back(key);
            inner.entries.insert(key, vector);
        }
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.entries.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(hits, misses)` since construction.
    pub fn stats(&self) -> (u64, u64) {
        self.inner
            .lock()
            .map(|inner| (inner.hits, inner.misses))
            .unwrap_or((0, 0))
    }
}

/// Narrowband plane-wave phase model of the array.
pub struct SteeringModel {
    positions: Vec<[f64; 3]>,
    speed_of_sound: f64,
    cache: Option<SteeringCache>,
}

impl SteeringModel {
    pub fn new(geometry: &ArrayGeometry, cache_capacity: usize) -> Self {
        let cache = (cache_capacity > 0).then(|| SteeringCache::with_capacity(cache_capacity));
        Self {
            positions: geometry.positions().to_vec(),
            speed_of_sound: geometry.speed_of_sound(),
            cache,
        }
    }

    /// `a[m] = exp(i k dot(u, p_m))` with `k = 2 pi f / c`.
    pub fn compute(&self, direction: Direction, frequency: f64) -> Array1<Complex64> {
        let unit = direction.unit_vector();
        let wave_number = 2.0 * PI * frequency / self.speed_of_sound;
        self.positions
            .iter()
            .map(|position| Complex64::from_polar(1.0, wave_number * dot(&unit, position)))
            .collect()
    }

    /// Cached variant of [`SteeringModel::compute`].
    pub fn vector(&self, direction: Direction, frequency: f64) -> Array1<Complex64> {
        let Some(cache) = &self.cache else {
            return self.compute(direction, frequency);
        };
        let key = key(direction, frequency);
        if let Some(vector) = cache.get(&key) {
            return vector;
        }
        let vector = self.compute(direction, frequency);
        cache.insert(key, vector.clone());
        vector
    }

    pub fn cache(&self) -> Option<&SteeringCache> {
        self.cache.as_ref()
    }

    pub fn num_mics(&self) -> usize {
        self.positions.len()
    }
}
