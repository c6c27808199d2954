//! Per-mesh interaction actions.
//!
//! A mesh gets an [`ActionManager`] holding actions keyed by [`Trigger`].
//! The scene runs them when the trigger happens (see [`Scene::dispatch`]).

use rand::{Rng, SeedableRng, distributions::Standard, rngs::StdRng};

use crate::data_structures::{
    material::{Colour3, MaterialId},
    scene_graph::{MeshId, Scene},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Trigger {
    /// Pointer pressed and released over the same mesh.
    OnPick,
}

pub trait Action {
    fn execute(&mut self, scene: &mut Scene, mesh: MeshId);
}

/// Runs an arbitrary closure.
pub struct ExecuteCodeAction<F>(pub F);

impl<F> Action for ExecuteCodeAction<F>
where
    F: FnMut(&mut Scene, MeshId),
{
    fn execute(&mut self, scene: &mut Scene, mesh: MeshId) {
        (self.0)(scene, mesh)
    }
}

/// Replaces a material's diffuse colour with a uniformly random RGB triple.
pub struct RecolorOnPick {
    material: MaterialId,
    rng: StdRng,
}

impl RecolorOnPick {
    pub fn new(material: MaterialId) -> Self {
        Self::with_rng(material, StdRng::from_entropy())
    }

    pub fn with_rng(material: MaterialId, rng: StdRng) -> Self {
        Self { material, rng }
    }

    fn sample(&mut self) -> Colour3 {
        // Standard yields floats in [0, 1)
        Colour3::new(
            self.rng.sample(Standard),
            self.rng.sample(Standard),
            self.rng.sample(Standard),
        )
    }
}

impl Action for RecolorOnPick {
    fn execute(&mut self, scene: &mut Scene, mesh: MeshId) {
        let colour = self.sample();
        match scene.material_mut(self.material) {
            Some(material) => {
                log::debug!("recolouring {:?} ({}) to {:?}", mesh, material.name, colour);
                material.diffuse = colour;
            }
            None => log::warn!("pick on {:?} refers to a missing material", mesh),
        }
    }
}

#[derive(Default)]
pub struct ActionManager {
    actions: Vec<(Trigger, Box<dyn Action>)>,
}

impl ActionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_action(&mut self, trigger: Trigger, action: Box<dyn Action>) {
        self.actions.push((trigger, action));
    }

    pub fn has_trigger(&self, trigger: Trigger) -> bool {
        self.actions.iter().any(|(t, _)| *t == trigger)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub(crate) fn append(&mut self, mut other: ActionManager) {
        self.actions.append(&mut other.actions);
    }

    /// Runs every action registered for `trigger` in registration order.
    pub(crate) fn process(&mut self, trigger: Trigger, scene: &mut Scene, mesh: MeshId) -> usize {
        let mut executed = 0;
        for (t, action) in self.actions.iter_mut() {
            if *t == trigger {
                action.execute(scene, mesh);
                executed += 1;
            }
        }
        executed
    }
}

impl std::fmt::Debug for ActionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|(t, _)| t))
            .finish()
    }
}
