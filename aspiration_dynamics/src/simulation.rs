use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, StandardNormal};

use crate::aspiration::{AspirationPolicy, AspirationType};
use crate::error::{Result, SimError};
use crate::params::{ModelParams, UncertaintyRegime};
use crate::peer::{PeerResolver, PeerStrategy};
use crate::stats;

/// Everything a single run needs besides its seed and length
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub n_firms: usize,
    pub aspiration: AspirationType,
    pub strategy: PeerStrategy,
    /// Technology carry-over factor
    pub d: f64,
    /// Market persistence factor
    pub v: f64,
    pub params: ModelParams,
}

impl SimulationConfig {
    pub fn new(
        n_firms: usize,
        aspiration: AspirationType,
        strategy: PeerStrategy,
        regime: &UncertaintyRegime,
        params: ModelParams,
    ) -> Self {
        SimulationConfig {
            n_firms,
            aspiration,
            strategy,
            d: regime.d,
            v: regime.v,
            params,
        }
    }

    /// Build a config from textual aspiration and strategy names
    pub fn from_names(
        n_firms: usize,
        aspiration: &str,
        strategy: &str,
        regime: &UncertaintyRegime,
        params: ModelParams,
    ) -> Result<Self> {
        Ok(Self::new(
            n_firms,
            aspiration.parse()?,
            strategy.parse()?,
            regime,
            params,
        ))
    }

    pub fn validate(&self) -> Result<()> {
        if self.n_firms == 0 {
            return Err(SimError::InvalidConfiguration(
                "n_firms must be positive".to_string(),
            ));
        }
        if !self.d.is_finite() || !self.v.is_finite() {
            return Err(SimError::InvalidConfiguration(format!(
                "d and v must be finite (d={}, v={})",
                self.d, self.v
            )));
        }
        self.params.validate()
    }
}

/// Performance of every firm in every period, row-major `(n_periods × n_firms)`
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    n_periods: usize,
    n_firms: usize,
    data: Vec<f64>,
}

/// Mean performance and its standard deviation ("risk") for one firm
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirmSummary {
    pub performance: f64,
    pub risk: f64,
}

impl Trajectory {
    pub fn with_capacity(n_periods: usize, n_firms: usize) -> Self {
        Trajectory {
            n_periods: 0,
            n_firms,
            data: Vec::with_capacity(n_periods * n_firms),
        }
    }

    fn push_row(&mut self, row: &[f64]) {
        debug_assert_eq!(row.len(), self.n_firms);
        self.data.extend_from_slice(row);
        self.n_periods += 1;
    }

    /// `(n_periods, n_firms)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_periods, self.n_firms)
    }

    pub fn n_periods(&self) -> usize {
        self.n_periods
    }

    pub fn n_firms(&self) -> usize {
        self.n_firms
    }

    pub fn is_empty(&self) -> bool {
        self.n_periods == 0
    }

    /// Performance vector of period `t`
    pub fn row(&self, t: usize) -> &[f64] {
        &self.data[t * self.n_firms..(t + 1) * self.n_firms]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on 0
        self.data.chunks_exact(self.n_firms.max(1))
    }

    /// Performance of firm `firm` across all periods
    pub fn firm_series(&self, firm: usize) -> Vec<f64> {
        self.rows().map(|row| row[firm]).collect()
    }

    /// Mean and population standard deviation across periods
    ///
    /// An empty trajectory summarises to zeros.
    pub fn firm_summary(&self, firm: usize) -> FirmSummary {
        let series = self.firm_series(firm);
        FirmSummary {
            performance: stats::mean(&series),
            risk: stats::std_dev(&series),
        }
    }

    pub fn summaries(&self) -> Vec<FirmSummary> {
        (0..self.n_firms).map(|i| self.firm_summary(i)).collect()
    }
}

/// One population of firms evolving under a fixed aspiration rule
///
/// Firm state is kept as index-aligned arrays. Each period every firm
/// decides from last period's performance and aspiration, then all new
/// performances are computed, and only then are aspirations updated.
pub struct Simulation {
    config: SimulationConfig,
    rng: StdRng,
    resolver: PeerResolver,
    aspirations: AspirationPolicy,
    tech: Vec<f64>,
    market: Vec<f64>,
    performance: Vec<f64>,
    // scratch buffers reused across periods
    next_tech: Vec<f64>,
    next_market: Vec<f64>,
    next_performance: Vec<f64>,
    peers: Vec<f64>,
    period: usize,
    last_searchers: usize,
}

impl Simulation {
    /// Validate the config and draw the initial population
    pub fn new(config: SimulationConfig, seed: u64) -> Result<Self> {
        config.validate()?;

        let n = config.n_firms;
        let mut rng = StdRng::seed_from_u64(seed);

        let tech: Vec<f64> = draw_normals(&mut rng, n);
        let market: Vec<f64> = draw_normals(&mut rng, n);
        let performance: Vec<f64> = tech.iter().zip(&market).map(|(t, m)| t + m).collect();
        let initial_aspirations = draw_normals(&mut rng, n);

        let mut aspirations = AspirationPolicy::new(config.aspiration, config.params);
        aspirations.initialize(initial_aspirations);

        let resolver = PeerResolver::new(config.strategy, &config.params);
        if config.strategy != PeerStrategy::Conservative && resolver.group_size(n) >= n {
            log::warn!(
                "reference group of {} covers the whole population of {} firms",
                resolver.group_size(n),
                n
            );
        }

        Ok(Simulation {
            config,
            rng,
            resolver,
            aspirations,
            tech,
            market,
            performance,
            next_tech: vec![0.0; n],
            next_market: vec![0.0; n],
            next_performance: vec![0.0; n],
            peers: Vec::with_capacity(n),
            period: 0,
            last_searchers: 0,
        })
    }

    /// Advance one period and return the new performance vector
    pub fn step(&mut self) -> &[f64] {
        let n = self.config.n_firms;
        let d = self.config.d;
        let v = self.config.v;

        // Market conditions move regardless of the firms' decisions
        for i in 0..n {
            let shock: f64 = StandardNormal.sample(&mut self.rng);
            self.next_market[i] = v * self.market[i] + (1.0 - v) * shock;
        }

        // Decisions compare last period's performance with the current aspiration
        let mut searchers = 0;
        for i in 0..n {
            let carried = d * self.tech[i];
            self.next_tech[i] = if self.performance[i] < self.aspirations.level(i) {
                searchers += 1;
                let draw: f64 = StandardNormal.sample(&mut self.rng);
                carried.max(draw)
            } else {
                carried
            };
        }

        for i in 0..n {
            self.next_performance[i] = self.next_tech[i] + self.next_market[i];
        }

        // Aspirations only ever see the post-decision performance of everyone
        if self.aspirations.kind().uses_peers() {
            self.resolver.resolve_all(&self.next_performance, &mut self.peers);
        } else {
            self.peers.clear();
            self.peers.extend_from_slice(&self.next_performance);
        }
        for i in 0..n {
            self.aspirations.update(i, self.next_performance[i], self.peers[i]);
        }

        std::mem::swap(&mut self.tech, &mut self.next_tech);
        std::mem::swap(&mut self.market, &mut self.next_market);
        std::mem::swap(&mut self.performance, &mut self.next_performance);

        self.period += 1;
        self.last_searchers = searchers;
        log::trace!("period {}: {}/{} firms searched", self.period, searchers, n);

        &self.performance
    }

    /// Run `n_periods` steps and return the recorded performance matrix
    pub fn run(&mut self, n_periods: usize) -> Trajectory {
        let mut trajectory = Trajectory::with_capacity(n_periods, self.config.n_firms);
        for _ in 0..n_periods {
            self.step();
            trajectory.push_row(&self.performance);
        }
        trajectory
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Periods completed so far
    pub fn period(&self) -> usize {
        self.period
    }

    pub fn tech(&self) -> &[f64] {
        &self.tech
    }

    pub fn market(&self) -> &[f64] {
        &self.market
    }

    pub fn performance(&self) -> &[f64] {
        &self.performance
    }

    pub fn aspiration_levels(&self) -> &[f64] {
        self.aspirations.levels()
    }

    /// Share of firms that searched for a new technology in the last period
    pub fn search_rate(&self) -> f64 {
        self.last_searchers as f64 / self.config.n_firms as f64
    }
}

/// Convenience wrapper: build, run and return the trajectory
pub fn run_single(config: SimulationConfig, seed: u64, n_periods: usize) -> Result<Trajectory> {
    let mut simulation = Simulation::new(config, seed)?;
    Ok(simulation.run(n_periods))
}

fn draw_normals(rng: &mut StdRng, n: usize) -> Vec<f64> {
    (0..n).map(|_| StandardNormal.sample(rng)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn config(aspiration: AspirationType, strategy: PeerStrategy) -> SimulationConfig {
        SimulationConfig::new(
            20,
            aspiration,
            strategy,
            &UncertaintyRegime::new("low_tech_low_market", 0.9, 0.9),
            ModelParams::default(),
        )
    }

    #[test]
    fn performance_is_tech_plus_market_every_period() {
        for aspiration in AspirationType::ALL {
            let mut sim = Simulation::new(config(aspiration, PeerStrategy::Stepwise), 3).unwrap();
            for (t, m, p) in zip3(sim.tech(), sim.market(), sim.performance()) {
                assert_eq!(p, t + m);
            }
            for _ in 0..25 {
                sim.step();
                for (t, m, p) in zip3(sim.tech(), sim.market(), sim.performance()) {
                    assert_eq!(p, t + m);
                }
            }
        }
    }

    fn zip3<'a>(
        a: &'a [f64],
        b: &'a [f64],
        c: &'a [f64],
    ) -> impl Iterator<Item = (f64, f64, f64)> + 'a {
        a.iter().zip(b).zip(c).map(|((&x, &y), &z)| (x, y, z))
    }

    #[test]
    fn zero_periods_gives_empty_trajectory() {
        let trajectory = run_single(config(AspirationType::Social, PeerStrategy::Ambitious), 1, 0)
            .unwrap();
        assert_eq!(trajectory.shape(), (0, 20));
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.rows().count(), 0);
    }

    #[test]
    fn trajectory_records_every_period() {
        let mut sim = Simulation::new(config(AspirationType::Mixed, PeerStrategy::Stepwise), 9)
            .unwrap();
        let trajectory = sim.run(15);
        assert_eq!(trajectory.shape(), (15, 20));
        assert_eq!(sim.period(), 15);
        assert_eq!(trajectory.row(14), sim.performance());
    }

    #[test]
    fn firms_at_or_above_aspiration_only_decay() {
        let mut sim =
            Simulation::new(config(AspirationType::Historical, PeerStrategy::Stepwise), 5).unwrap();
        sim.step();
        for _ in 0..10 {
            let satisfied: Vec<(usize, f64)> = (0..20)
                .filter(|&i| sim.performance()[i] >= sim.aspiration_levels()[i])
                .map(|i| (i, sim.tech()[i]))
                .collect();
            let searching: Vec<(usize, f64)> = (0..20)
                .filter(|&i| sim.performance()[i] < sim.aspiration_levels()[i])
                .map(|i| (i, sim.tech()[i]))
                .collect();
            sim.step();
            for (i, tech) in satisfied {
                assert_eq!(sim.tech()[i], 0.9 * tech);
            }
            for (i, tech) in searching {
                assert!(sim.tech()[i] >= 0.9 * tech);
            }
        }
    }

    #[test]
    fn historical_aspiration_follows_own_performance() {
        let mut sim =
            Simulation::new(config(AspirationType::Historical, PeerStrategy::Ambitious), 17)
                .unwrap();
        let before: Vec<f64> = sim.aspiration_levels().to_vec();
        sim.step();
        for i in 0..20 {
            let expected = 0.5 * before[i] + 0.5 * 1.05 * sim.performance()[i];
            assert_abs_diff_eq!(sim.aspiration_levels()[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn social_aspiration_uses_same_period_peers() {
        let mut sim =
            Simulation::new(config(AspirationType::Social, PeerStrategy::Conservative), 21)
                .unwrap();
        let before: Vec<f64> = sim.aspiration_levels().to_vec();
        sim.step();
        let population_mean = stats::mean(sim.performance());
        for i in 0..20 {
            let expected = 0.5 * before[i] + 0.5 * 1.05 * population_mean;
            assert_abs_diff_eq!(sim.aspiration_levels()[i], expected, epsilon = 1e-12);
        }
    }

    #[test]
    fn single_firm_population_runs() {
        let cfg = SimulationConfig {
            n_firms: 1,
            ..config(AspirationType::Switching, PeerStrategy::Stepwise)
        };
        let trajectory = run_single(cfg, 4, 30).unwrap();
        assert_eq!(trajectory.shape(), (30, 1));
        assert!(trajectory.row(29)[0].is_finite());
    }

    #[test]
    fn zero_firms_rejected() {
        let cfg = SimulationConfig {
            n_firms: 0,
            ..config(AspirationType::Social, PeerStrategy::Stepwise)
        };
        assert!(matches!(
            Simulation::new(cfg, 0),
            Err(SimError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn names_are_checked_at_construction() {
        let regime = UncertaintyRegime::new("high_tech_high_market", 0.5, 0.5);
        let params = ModelParams::default();
        assert!(matches!(
            SimulationConfig::from_names(10, "greedy", "stepwise", &regime, params),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            SimulationConfig::from_names(10, "mixed", "random", &regime, params),
            Err(SimError::UnknownStrategy(_))
        ));
        let cfg = SimulationConfig::from_names(10, "mixed", "ambitious", &regime, params).unwrap();
        assert_eq!(cfg.aspiration, AspirationType::Mixed);
        assert_eq!(cfg.strategy, PeerStrategy::Ambitious);
        assert_eq!((cfg.d, cfg.v), (0.5, 0.5));
    }

    #[test]
    fn search_rate_is_a_share() {
        let mut sim =
            Simulation::new(config(AspirationType::Switching, PeerStrategy::Ambitious), 8).unwrap();
        for _ in 0..20 {
            sim.step();
            let rate = sim.search_rate();
            assert!((0.0..=1.0).contains(&rate));
        }
    }

    #[test]
    fn firm_summary_matches_series() {
        let trajectory =
            run_single(config(AspirationType::Mixed, PeerStrategy::Stepwise), 12, 40).unwrap();
        let series = trajectory.firm_series(3);
        let summary = trajectory.firm_summary(3);
        assert_eq!(series.len(), 40);
        assert_abs_diff_eq!(summary.performance, stats::mean(&series), epsilon = 1e-12);
        assert!(summary.risk > 0.0);
    }
}
