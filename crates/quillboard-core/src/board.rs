//! Board document: the element table plus explicit z-order.
//!
//! The board is an owned handle; consumers hold a reference to it rather
//! than reaching into ambient global state. Merge-resolved writes come from
//! the sync layer only; the interaction machine proposes intents.

use crate::element::{Element, ElementId};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A board document containing all elements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    /// Unique board identifier, shared by all participants of a session.
    pub id: String,
    /// Board title.
    pub title: String,
    /// Elements keyed by id.
    pub elements: HashMap<ElementId, Element>,
    /// Z-order, back to front.
    pub order: Vec<ElementId>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: "Untitled".to_string(),
            elements: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Insert or replace an element by id. New ids append on top.
    pub fn upsert(&mut self, element: Element) {
        let id = element.id();
        if self.elements.insert(id, element).is_none() {
            self.order.push(id);
        }
    }

    pub fn remove(&mut self, id: ElementId) -> Option<Element> {
        self.order.retain(|&e| e != id);
        self.elements.remove(&id)
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.order.clear();
    }

    /// Elements in z-order, back to front.
    pub fn elements_ordered(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    /// Replace the full document. Input is deduplicated by id keeping the
    /// last-seen entry, since transient merge states can contain duplicates.
    pub fn replace_all(&mut self, next: Vec<Element>) {
        self.elements.clear();
        self.order.clear();
        for element in next {
            let id = element.id();
            if self.elements.insert(id, element).is_none() {
                self.order.push(id);
            } else {
                // Duplicate id: keep the later entry but also its later
                // position in the ordering.
                self.order.retain(|&e| e != id);
                self.order.push(id);
            }
        }
    }

    /// Topmost (highest z-order) element whose shape contains the point,
    /// skipping locked and ephemeral elements.
    pub fn topmost_at(&self, point: Point, tolerance: f64) -> Option<ElementId> {
        self.order.iter().rev().find_map(|&id| {
            self.elements
                .get(&id)
                .filter(|e| !e.locked() && !e.is_ephemeral() && e.hit_test(point, tolerance))
                .map(|_| id)
        })
    }

    /// All elements whose bounds intersect the rect, in z-order.
    pub fn elements_in_rect(&self, rect: Rect) -> Vec<ElementId> {
        self.order
            .iter()
            .filter_map(|&id| {
                let element = self.elements.get(&id)?;
                if element.locked() || element.is_ephemeral() {
                    return None;
                }
                let bounds = element.bounds()?;
                (rect.intersect(bounds).area() > 0.0).then_some(id)
            })
            .collect()
    }

    pub fn bring_to_front(&mut self, id: ElementId) {
        if self.elements.contains_key(&id) {
            self.order.retain(|&e| e != id);
            self.order.push(id);
        }
    }

    pub fn send_to_back(&mut self, id: ElementId) {
        if self.elements.contains_key(&id) {
            self.order.retain(|&e| e != id);
            self.order.insert(0, id);
        }
    }

    /// Union of all element bounds.
    pub fn bounds(&self) -> Option<Rect> {
        let mut result: Option<Rect> = None;
        for element in self.elements.values() {
            if let Some(bounds) = element.bounds() {
                result = Some(match result {
                    Some(r) => r.union(bounds),
                    None => bounds,
                });
            }
        }
        result
    }
}
