use crate::id::{RandomSsrc, SsrcGenerator};
use crate::Simulcast;

pub(crate) const DEFAULT_NUM_OF_LAYERS: usize = 3;

/// Customized config for creating a [`Simulcast`] instance.
///
/// ```
/// use simulcast_sdp::SimulcastConfig;
///
/// let simulcast = SimulcastConfig::new()
///     .set_num_of_layers(2)
///     .set_explode_remote_simulcast(true)
///     .build();
/// ```
///
/// Configs implement [`Clone`] to help create one `Simulcast` per peer connection.
#[derive(Debug, Clone)]
pub struct SimulcastConfig {
    num_of_layers: usize,
    explode_remote_simulcast: bool,
    simulcast_supported: bool,
}

impl SimulcastConfig {
    /// Creates a new default config.
    pub fn new() -> Self {
        SimulcastConfig::default()
    }

    /// Number of simulcast layers, including the primary, to put on a local
    /// video source.
    pub fn num_of_layers(&self) -> usize {
        self.num_of_layers
    }

    /// Set the number of simulcast layers.
    ///
    /// A value of 1 disables synthesis of local layers. 0 is treated as 1.
    ///
    /// Defaults to 3.
    pub fn set_num_of_layers(mut self, num_of_layers: usize) -> Self {
        self.num_of_layers = num_of_layers.max(1);
        self
    }

    /// Whether a remote SIM group is exploded into independent streams.
    pub fn explode_remote_simulcast(&self) -> bool {
        self.explode_remote_simulcast
    }

    /// Explode remote simulcast into one stream per layer instead of keeping
    /// only the lowest layer.
    ///
    /// Defaults to `false`.
    pub fn set_explode_remote_simulcast(mut self, enabled: bool) -> Self {
        self.explode_remote_simulcast = enabled;
        self
    }

    /// Whether the host environment can send simulcast.
    pub fn simulcast_supported(&self) -> bool {
        self.simulcast_supported
    }

    /// Report whether the host environment can send simulcast. When it can't,
    /// local descriptions are left alone.
    ///
    /// Defaults to `true`.
    pub fn set_simulcast_supported(mut self, supported: bool) -> Self {
        self.simulcast_supported = supported;
        self
    }

    /// Create a [`Simulcast`] instance using this config.
    pub fn build(self) -> Simulcast {
        self.build_with_generator(RandomSsrc)
    }

    /// Create a [`Simulcast`] instance drawing new SSRCs from `generator`.
    pub fn build_with_generator<G>(self, generator: G) -> Simulcast
    where
        G: SsrcGenerator + Send + 'static,
    {
        Simulcast::new_from_config(self, Box::new(generator))
    }
}

impl Default for SimulcastConfig {
    fn default() -> Self {
        SimulcastConfig {
            num_of_layers: DEFAULT_NUM_OF_LAYERS,
            explode_remote_simulcast: false,
            simulcast_supported: true,
        }
    }
}
