use std::sync::Arc;

use action_primitives::{ActionPrimitives, WaitTiers};

use crate::tempo::Tempo;

/// Entry point for the resolvers; cheap to clone.
#[derive(Clone)]
pub struct Resolvers {
    pub(crate) primitives: Arc<dyn ActionPrimitives>,
    pub(crate) tiers: WaitTiers,
    pub(crate) tempo: Tempo,
}

impl Resolvers {
    pub fn primitives(&self) -> &Arc<dyn ActionPrimitives> {
        &self.primitives
    }

    pub fn tiers(&self) -> &WaitTiers {
        &self.tiers
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }
}

pub struct ResolverBuilder {
    primitives: Arc<dyn ActionPrimitives>,
    tiers: WaitTiers,
    tempo: Tempo,
}

impl ResolverBuilder {
    pub fn new(primitives: Arc<dyn ActionPrimitives>) -> Self {
        Self {
            primitives,
            tiers: WaitTiers::default(),
            tempo: Tempo::default(),
        }
    }

    pub fn with_tiers(mut self, tiers: WaitTiers) -> Self {
        self.tiers = tiers;
        self
    }

    pub fn with_tempo(mut self, tempo: Tempo) -> Self {
        self.tempo = tempo;
        self
    }

    pub fn build(self) -> Resolvers {
        Resolvers {
            primitives: self.primitives,
            tiers: self.tiers,
            tempo: self.tempo,
        }
    }
}
