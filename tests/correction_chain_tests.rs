//! Correction Chain Tests
//!
//! Builds complete chains over small datasets with in-test power curves,
//! deviation matrices and original datasets, and checks the written columns
//! against direct evaluation of the formulas.

use std::collections::BTreeMap;

use pcwg_corrections::config::RewsConfig;
use pcwg_corrections::corrections::rews::REWS_TO_HUB_RATIO_COLUMN;
use pcwg_corrections::{
    CorrectionChain, CorrectionError, Dataset, DensityEquivalentWindSpeed, DeviationMatrix,
    DeviationMatrixDefinition, MatrixDimension, OriginalDataset, PowerCurve,
    PowerDeviationMatrixCorrection, ProductionByHeightCorrection, RotorEquivalentWindSpeed, Row,
    RowCalculator, Series, Severity, SeverityBands, TurbulenceCorrection, TurbulencePowerCurve,
    WebServiceCorrection,
};

// ============================================================================
// Collaborator doubles
// ============================================================================

/// Cubic ramp between cut-in and rated, flat at rated power.
struct RampCurve {
    cut_in: f64,
    rated_speed: f64,
    rated_power: f64,
}

impl Default for RampCurve {
    fn default() -> Self {
        Self {
            cut_in: 3.0,
            rated_speed: 13.0,
            rated_power: 2000.0,
        }
    }
}

impl PowerCurve for RampCurve {
    fn power(&self, wind_speed: f64) -> f64 {
        if wind_speed <= self.cut_in {
            0.0
        } else if wind_speed >= self.rated_speed {
            self.rated_power
        } else {
            let x = (wind_speed - self.cut_in) / (self.rated_speed - self.cut_in);
            self.rated_power * x.powi(3)
        }
    }

    fn rated_power(&self) -> f64 {
        self.rated_power
    }
}

impl TurbulencePowerCurve for RampCurve {
    fn turbulence_power(&self, wind_speed: f64, turbulence_intensity: f64) -> f64 {
        // Turbulence lifts output below rated in proportion to intensity.
        (self.power(wind_speed) * (1.0 + turbulence_intensity)).min(self.rated_power)
    }
}

/// One-dimensional matrix with equal-width bins that counts lookups
/// falling outside the outer bin edges.
struct BinnedMatrix {
    dimensions: Vec<MatrixDimension>,
    bin_width: f64,
    deviations: Vec<f64>,
    lookups: usize,
    below: usize,
    above: usize,
}

impl BinnedMatrix {
    fn turbulence() -> Self {
        Self {
            dimensions: vec![MatrixDimension {
                parameter: "Turbulence".to_string(),
                center_of_first_bin: 0.05,
                center_of_last_bin: 0.15,
            }],
            bin_width: 0.05,
            deviations: vec![0.01, 0.0, -0.02],
            lookups: 0,
            below: 0,
            above: 0,
        }
    }
}

impl DeviationMatrix for BinnedMatrix {
    fn dimensions(&self) -> &[MatrixDimension] {
        &self.dimensions
    }

    fn deviation(&mut self, parameters: &BTreeMap<String, f64>) -> f64 {
        self.lookups += 1;
        let dimension = &self.dimensions[0];
        let value = parameters[&dimension.parameter];
        let low_edge = dimension.center_of_first_bin - self.bin_width / 2.0;
        let high_edge = dimension.center_of_last_bin + self.bin_width / 2.0;
        if value < low_edge {
            self.below += 1;
            return 0.0;
        }
        if value > high_edge {
            self.above += 1;
            return 0.0;
        }
        let bin = ((value - low_edge) / self.bin_width).floor() as usize;
        self.deviations[bin.min(self.deviations.len() - 1)]
    }

    fn reset_out_of_range_count(&mut self) {
        self.lookups = 0;
        self.below = 0;
        self.above = 0;
    }

    fn out_of_range_fraction(&self, _dimension: Option<&str>) -> f64 {
        (self.below + self.above) as f64 / self.lookups.max(1) as f64
    }

    fn below_fraction(&self, _dimension: &str) -> f64 {
        self.below as f64 / self.lookups.max(1) as f64
    }

    fn above_fraction(&self, _dimension: &str) -> f64 {
        self.above as f64 / self.lookups.max(1) as f64
    }
}

/// Original dataset returning fixed series.
struct FixedOriginal {
    rews: Series,
    production: Series,
}

impl OriginalDataset for FixedOriginal {
    fn calculate_rews(
        &self,
        _veer: bool,
        _upflow: bool,
        _exponent: f64,
    ) -> Result<Series, CorrectionError> {
        Ok(self.rews.clone())
    }

    fn calculate_production_by_height(
        &self,
        power_curve: &dyn PowerCurve,
    ) -> Result<Series, CorrectionError> {
        let values = self.production.values().iter().map(|&v| power_curve.power(v)).collect();
        Ok(Series::new(self.production.index().to_vec(), values)?)
    }
}

/// Records which columns the REWS matrix was asked to compare.
struct RecordingDefinition;

#[derive(Debug, PartialEq)]
struct RecordedComparison {
    value_column: String,
    bin_column: String,
    rows: usize,
}

impl DeviationMatrixDefinition for RecordingDefinition {
    type Matrix = RecordedComparison;

    fn new_deviation_matrix(
        &self,
        dataset: &Dataset,
        value_column: &str,
        bin_column: &str,
    ) -> Result<Self::Matrix, CorrectionError> {
        Ok(RecordedComparison {
            value_column: value_column.to_string(),
            bin_column: bin_column.to_string(),
            rows: dataset.len(),
        })
    }
}

/// Stand-in for a remote estimator.
struct EchoService {
    calls: usize,
}

impl RowCalculator for EchoService {
    fn power(&mut self, row: &Row<'_>) -> Result<f64, CorrectionError> {
        self.calls += 1;
        Ok(row.get("WS")? * 100.0)
    }
}

struct FailingService;

impl RowCalculator for FailingService {
    fn power(&mut self, _row: &Row<'_>) -> Result<f64, CorrectionError> {
        Err(CorrectionError::Collaborator {
            collaborator: "web service".to_string(),
            message: "connection refused".to_string(),
        })
    }
}

fn sample_dataset() -> Dataset {
    let mut data = Dataset::with_rows(4);
    data.insert_column("WS", vec![10.0, 6.0, 8.0, 15.0]).unwrap();
    data.insert_column("Density", vec![1.0, 1.225, 1.25, 1.18]).unwrap();
    data.insert_column("TI", vec![0.08, 0.14, 0.01, 0.40]).unwrap();
    data
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn density_then_turbulence_writes_named_columns() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());

    let source = chain.source("WS");
    chain.finalise_source(source, &mut data, None).unwrap();
    let density =
        DensityEquivalentWindSpeed::apply(&mut chain, &mut data, source, 1.225, "Density", None)
            .unwrap();
    let turbulence =
        TurbulenceCorrection::apply(&mut chain, &mut data, density.node, "TI", &curve).unwrap();

    assert!(data.has_column("Density Wind Speed"));
    assert!(data.has_column("Density & Turbulence Power"));
    assert_eq!(
        chain.node(turbulence.node).power_column(),
        Some("Density & Turbulence Power")
    );

    let ws = data.column("WS").unwrap().to_vec();
    let rho = data.column("Density").unwrap().to_vec();
    let ti = data.column("TI").unwrap().to_vec();
    let corrected = data.column("Density Wind Speed").unwrap();
    let power = data.column("Density & Turbulence Power").unwrap();

    for i in 0..data.len() {
        let expected_speed = ws[i] * (rho[i] / 1.225).powf(1.0 / 3.0);
        assert!(close(corrected[i], expected_speed), "row {i} speed");
        let expected_power = curve.turbulence_power(expected_speed, ti[i]);
        assert!(close(power[i], expected_power), "row {i} power");
    }

    assert!(close(corrected[0], 10.0 * (1.0_f64 / 1.225).powf(1.0 / 3.0)));
    assert!((corrected[0] - 9.428).abs() < 1e-3);
}

#[test]
fn diagnostics_follow_construction_order() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());

    let source = chain.source("WS");
    let density =
        DensityEquivalentWindSpeed::apply(&mut chain, &mut data, source, 1.225, "Density", Some(&curve))
            .unwrap();
    TurbulenceCorrection::apply(&mut chain, &mut data, density.node, "TI", &curve).unwrap();

    let messages: Vec<&str> = chain
        .diagnostics()
        .entries()
        .iter()
        .map(|d| d.message.as_str())
        .collect();
    assert_eq!(
        messages,
        vec![
            "Performing Density Correction...",
            "Correcting to reference density of 1.2250 kg/m^3",
            "Density Correction Complete.",
            "Performing Density & Turbulence Correction...",
            "Density & Turbulence Correction Complete.",
        ]
    );
    assert!(data.has_column("Density Power"));
}

#[test]
fn correction_after_power_based_fails_and_keeps_earlier_columns() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());

    let source = chain.source("WS");
    let density =
        DensityEquivalentWindSpeed::apply(&mut chain, &mut data, source, 1.225, "Density", None)
            .unwrap();
    let turbulence =
        TurbulenceCorrection::apply(&mut chain, &mut data, density.node, "TI", &curve).unwrap();
    let columns_before: Vec<String> = data.column_names().map(str::to_string).collect();

    let err =
        DensityEquivalentWindSpeed::apply(&mut chain, &mut data, turbulence.node, 1.225, "Density", None)
            .unwrap_err();
    match err {
        CorrectionError::CannotChain { correction, parent } => {
            assert_eq!(correction, "Density");
            assert_eq!(parent, "Density & Turbulence");
        }
        other => panic!("expected CannotChain, got {other:?}"),
    }

    let columns_after: Vec<String> = data.column_names().map(str::to_string).collect();
    assert_eq!(columns_before, columns_after, "no rollback and no partial write");
}

// ============================================================================
// Deviation matrix
// ============================================================================

#[test]
fn deviation_matrix_adjusts_power_and_reports_range() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let mut matrix = BinnedMatrix::turbulence();
    matrix.lookups = 99;
    let columns = BTreeMap::from([("Turbulence".to_string(), "TI".to_string())]);

    let source = chain.source("WS");
    let density =
        DensityEquivalentWindSpeed::apply(&mut chain, &mut data, source, 1.225, "Density", None)
            .unwrap();
    let pdm = PowerDeviationMatrixCorrection::apply(
        &mut chain,
        &mut data,
        density.node,
        &mut matrix,
        &columns,
        &curve,
    )
    .unwrap();

    let column = "Density & 1D Power Deviation Matrix Power";
    assert_eq!(chain.node(pdm.node).power_column(), Some(column));

    let speeds = data.column("Density Wind Speed").unwrap().to_vec();
    let power = data.column(column).unwrap();
    // TI 0.08 -> second bin (0.0), 0.14 -> third bin (-0.02), 0.01 below, 0.40 above
    assert!(close(power[0], curve.power(speeds[0])));
    assert!(close(power[1], curve.power(speeds[1]) * 0.98));
    assert!(close(power[2], curve.power(speeds[2])));
    assert!(close(power[3], curve.power(speeds[3])));

    // Counters were reset before the run: 2 of 4 out of range.
    assert_eq!(matrix.lookups, 4);
    assert!(close(pdm.report.out_of_range_fraction, 0.5));
    assert_eq!(pdm.report.severity, Severity::Critical);
    assert!(close(pdm.report.dimensions[0].below_fraction, 0.25));
    assert!(close(pdm.report.dimensions[0].above_fraction, 0.25));

    let diagnostics = chain.diagnostics();
    assert!(diagnostics.contains("Fraction of PDM values out of range 50.00%"));
    assert!(diagnostics.contains("-Turbulence values out of range 50.00% [0.05 to 0.15]"));
    assert!(diagnostics.contains("--25.00% values below"));
    assert!(diagnostics.contains("--25.00% values above"));
    assert_eq!(diagnostics.worst(), Some(Severity::Critical));
}

#[test]
fn deviation_matrix_within_range_is_informational() {
    let curve = RampCurve::default();
    let mut data = Dataset::with_rows(2);
    data.insert_column("WS", vec![7.0, 9.0]).unwrap();
    data.insert_column("TI", vec![0.06, 0.11]).unwrap();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let mut matrix = BinnedMatrix::turbulence();
    let columns = BTreeMap::from([("Turbulence".to_string(), "TI".to_string())]);

    let source = chain.source("WS");
    let pdm = PowerDeviationMatrixCorrection::apply(
        &mut chain, &mut data, source, &mut matrix, &columns, &curve,
    )
    .unwrap();

    assert_eq!(chain.node(pdm.node).correction_name(), Some("1D Power Deviation Matrix"));
    assert_eq!(pdm.report.severity, Severity::Info);
    assert_eq!(chain.diagnostics().worst(), Some(Severity::Info));
}

#[test]
fn deviation_matrix_unmapped_parameter_is_an_error() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let mut matrix = BinnedMatrix::turbulence();

    let source = chain.source("WS");
    let result = PowerDeviationMatrixCorrection::apply(
        &mut chain,
        &mut data,
        source,
        &mut matrix,
        &BTreeMap::new(),
        &curve,
    );
    assert!(matches!(result, Err(CorrectionError::UnmappedParameter(_))));
    assert_eq!(chain.len(), 1, "only the source remains");
    assert!(chain.diagnostics().is_empty());
}

#[test]
fn power_correction_on_columnless_source_leaves_chain_unchanged() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());

    let source = chain.columnless_source();
    let err = TurbulenceCorrection::apply(&mut chain, &mut data, source, "TI", &curve).unwrap_err();

    assert!(matches!(err, CorrectionError::MissingWindSpeed { .. }));
    assert_eq!(chain.len(), 1);
    assert!(chain.diagnostics().is_empty());
    assert!(!data.has_column("Turbulence Power"));
}

// ============================================================================
// REWS
// ============================================================================

#[test]
fn rews_scales_parent_speed_by_joined_ratio() {
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let original = FixedOriginal {
        rews: Series::new(vec![0, 1, 2, 3], vec![0.98, 1.01, 1.0, 0.95]).unwrap(),
        production: Series::default(),
    };
    let model = RewsConfig {
        exponent: 3.0,
        veer: true,
        upflow: false,
    };

    let source = chain.source("WS");
    let density =
        DensityEquivalentWindSpeed::apply(&mut chain, &mut data, source, 1.225, "Density", None)
            .unwrap();
    let rews = RotorEquivalentWindSpeed::apply(
        &mut chain,
        &mut data,
        density.node,
        &[&original],
        &model,
        &RecordingDefinition,
        None,
    )
    .unwrap();

    let column = "Density & REWS (Speed+Veer) Wind Speed";
    assert_eq!(chain.node(rews.node).wind_speed_column(), Some(column));

    let parent = data.column("Density Wind Speed").unwrap().to_vec();
    let ratio = data.column(REWS_TO_HUB_RATIO_COLUMN).unwrap().to_vec();
    let speed = data.column(column).unwrap();
    for i in 0..data.len() {
        assert!(close(speed[i], parent[i] * ratio[i]));
    }

    assert_eq!(
        rews.rews_matrix,
        RecordedComparison {
            value_column: REWS_TO_HUB_RATIO_COLUMN.to_string(),
            bin_column: "Density Wind Speed".to_string(),
            rows: 4,
        }
    );
    assert!(chain.diagnostics().contains("Calculating REWS Deviation Matrix..."));
    assert!(chain.diagnostics().contains("REWS Deviation Matrix Complete."));
}

#[test]
fn rews_then_turbulence_flattens_name() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let original = FixedOriginal {
        rews: Series::new(vec![0, 1, 2, 3], vec![1.0; 4]).unwrap(),
        production: Series::default(),
    };
    let model = RewsConfig {
        exponent: 2.0,
        veer: false,
        upflow: false,
    };

    let source = chain.source("WS");
    let density =
        DensityEquivalentWindSpeed::apply(&mut chain, &mut data, source, 1.225, "Density", None)
            .unwrap();
    let rews = RotorEquivalentWindSpeed::apply(
        &mut chain,
        &mut data,
        density.node,
        &[&original],
        &model,
        &RecordingDefinition,
        None,
    )
    .unwrap();
    let turbulence =
        TurbulenceCorrection::apply(&mut chain, &mut data, rews.node, "TI", &curve).unwrap();

    let name = chain.node(turbulence.node).correction_name().unwrap();
    assert_eq!(name, "Density, RAWS (Speed) & Turbulence");
    assert_eq!(name.matches(" & ").count(), 1);
    assert!(data.has_column("Density, RAWS (Speed) & Turbulence Power"));
}

#[test]
fn rews_ratio_rows_missing_from_join_are_nan() {
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let first = FixedOriginal {
        rews: Series::new(vec![0, 1, 2], vec![1.1, 1.2, 1.3]).unwrap(),
        production: Series::default(),
    };
    let second = FixedOriginal {
        rews: Series::new(vec![1, 2, 3], vec![9.0, 9.0, 9.0]).unwrap(),
        production: Series::default(),
    };

    let source = chain.source("WS");
    RotorEquivalentWindSpeed::apply(
        &mut chain,
        &mut data,
        source,
        &[&first, &second],
        &RewsConfig::default(),
        &RecordingDefinition,
        None,
    )
    .unwrap();

    let ratio = data.column(REWS_TO_HUB_RATIO_COLUMN).unwrap();
    assert!(ratio[0].is_nan());
    assert!(close(ratio[1], 1.2));
    assert!(close(ratio[2], 1.3));
    assert!(ratio[3].is_nan());
    assert!(data.column("REWS (Speed) Wind Speed").unwrap()[0].is_nan());
}

// ============================================================================
// Column-less sources
// ============================================================================

#[test]
fn production_by_height_roots_on_fresh_source() {
    let curve = RampCurve::default();
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let original = FixedOriginal {
        rews: Series::default(),
        production: Series::new(vec![0, 1, 2, 3], vec![8.0, 9.0, 10.0, 14.0]).unwrap(),
    };

    let production =
        ProductionByHeightCorrection::apply(&mut chain, &mut data, &[&original], &curve).unwrap();

    let node = chain.node(production.node);
    assert_eq!(node.correction_name(), Some("Production by Height"));
    let parent = node.parent().unwrap();
    assert!(chain.node(parent).is_raw());
    assert!(chain.node(parent).wind_speed_column().is_none());

    let power = data.column("Production by Height Power").unwrap();
    assert!(close(power[0], curve.power(8.0)));
    assert!(close(power[3], 2000.0));
}

#[test]
fn web_service_estimates_every_row() {
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());
    let mut service = EchoService { calls: 0 };

    let web = WebServiceCorrection::apply(&mut chain, &mut data, &mut service).unwrap();

    assert_eq!(service.calls, 4);
    assert_eq!(chain.node(web.node).power_column(), Some("WebService Power"));
    assert_eq!(
        data.column("WebService Power").unwrap(),
        &[1000.0, 600.0, 800.0, 1500.0]
    );
}

#[test]
fn web_service_failure_propagates() {
    let mut data = sample_dataset();
    let mut chain = CorrectionChain::with_bands(SeverityBands::default());

    let err = WebServiceCorrection::apply(&mut chain, &mut data, &mut FailingService).unwrap_err();
    assert_eq!(err.to_string(), "web service failed: connection refused");
    assert!(!data.has_column("WebService Power"));
}

#[test]
fn severity_bands_are_exclusive_at_edges() {
    let bands = SeverityBands::default();
    assert_eq!(bands.classify(0.05), Severity::Info);
    assert_eq!(bands.classify(0.0501), Severity::Warning);
    assert_eq!(bands.classify(0.20), Severity::Warning);
    assert_eq!(bands.classify(0.2001), Severity::Critical);
}
