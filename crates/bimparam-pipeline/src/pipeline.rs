// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Stage orchestration over one library store

use crate::config::PipelineConfig;
use crate::error::Result;
use bimparam_constraints::ConstraintSet;
use bimparam_geometry::{align_groups, tile_modules, GroupAlignment, ModulePlacement};
use bimparam_library::LibraryStore;
use bimparam_model::{
    Assembly, BoundingBox, Certificate, ElementId, ElementSource, ProgressCallback, TemplateId,
    TemplateInstance, TemplateRef,
};
use bimparam_normalizer::{Normalizer, NormalizerWarning, UsageSummary};
use bimparam_recognizer::{Recognizer, Unclustered};
use bimparam_solver::{CancelFlag, Reparametrizer, SolveRequest};
use bimparam_validator::{AssemblyExporter, AssemblyValidator, ExportBundle, ValidationReport};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;

/// What one ingest produced
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestReport {
    /// Normalization notices, in element order
    pub warnings: Vec<NormalizerWarning>,
    /// Stored template versions, in template id order
    pub templates: Vec<TemplateRef>,
    /// Template each clustered element belongs to
    pub assignments: BTreeMap<ElementId, TemplateId>,
    /// Elements left outside every template
    pub unclustered: Vec<Unclustered>,
}

/// The reparametrization pipeline
///
/// Owns the library store it was opened with; [`Pipeline::close`] hands it
/// back.
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    store: LibraryStore,
    normalizer: Normalizer,
    recognizer: Recognizer,
    solver: Reparametrizer,
    validator: AssemblyValidator,
}

impl Pipeline {
    /// Open a pipeline over a library store
    pub fn open(config: PipelineConfig, store: LibraryStore) -> Result<Self> {
        config.validate()?;
        log::info!("Pipeline opened over {} stored templates", store.len());
        Ok(Self {
            normalizer: Normalizer::new(config.normalizer.clone()),
            recognizer: Recognizer::new(config.recognizer.clone()),
            solver: Reparametrizer::new(config.solver.clone()),
            validator: AssemblyValidator::new(config.validator.clone()),
            config,
            store,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Library store in use
    pub fn store(&self) -> &LibraryStore {
        &self.store
    }

    /// Normalize, recognize and store the templates of a batch
    pub fn ingest(&self, source: &dyn ElementSource) -> Result<IngestReport> {
        self.ingest_with_progress(source, Box::new(|_, _| {}))
    }

    /// Ingest with progress reporting
    ///
    /// # Arguments
    /// * `source` - Raw records plus their unit scale
    /// * `on_progress` - Callback receiving (phase_name, percent_complete)
    ///
    /// # Returns
    /// Warnings, stored template versions and unclustered elements.
    /// Recognized families continue the stored identity they share source
    /// elements with; a template identical to the latest stored version is
    /// not stored again.
    pub fn ingest_with_progress(
        &self,
        source: &dyn ElementSource,
        on_progress: ProgressCallback,
    ) -> Result<IngestReport> {
        on_progress("Normalizing elements", 0.0);
        let normalized = self.normalizer.normalize(source)?;

        on_progress("Recognizing patterns", 40.0);
        let outcome = self.recognizer.recognize(&normalized.elements)?;

        on_progress("Storing templates", 80.0);
        let reconciled = self.store.reconcile(outcome.templates);
        let templates = reconciled
            .templates
            .into_iter()
            .map(|template| self.store.put(template))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let assignments = outcome
            .assignments
            .into_iter()
            .map(|(element, recognized)| {
                let identity = reconciled.renamed.get(&recognized).cloned().unwrap_or(recognized);
                (element, identity)
            })
            .collect();

        on_progress("Complete", 100.0);
        log::info!(
            "Ingested {} elements: {} templates, {} unclustered, {} warnings",
            normalized.elements.len(),
            templates.len(),
            outcome.unclustered.len(),
            normalized.warnings.len()
        );
        Ok(IngestReport {
            warnings: normalized.warnings,
            templates,
            assignments,
            unclustered: outcome.unclustered,
        })
    }

    /// Request for a new instance of the latest version of a template
    pub fn request(&self, template: &str, key: &str) -> Result<SolveRequest> {
        Ok(SolveRequest::new(self.store.get(template)?, key))
    }

    /// Solve a request
    pub fn reparametrize(&self, request: &SolveRequest) -> Result<TemplateInstance> {
        self.reparametrize_with_cancel(request, &CancelFlag::new())
    }

    /// Solve a request, honoring cancellation
    pub fn reparametrize_with_cancel(
        &self,
        request: &SolveRequest,
        cancel: &CancelFlag,
    ) -> Result<TemplateInstance> {
        let instance = self.solver.solve_with_cancel(request, cancel)?;
        log::info!(
            "Instance {} solved from {}",
            instance.id,
            instance.template
        );
        Ok(instance)
    }

    /// Re-solve an instance against the latest version of its template
    pub fn resolve(
        &self,
        previous: &TemplateInstance,
        constraints: ConstraintSet,
    ) -> Result<TemplateInstance> {
        let template = self.store.get(previous.template.id.as_str())?;
        let request = SolveRequest::revision_of(previous, template).with_constraints(constraints);
        self.reparametrize(&request)
    }

    /// Build an assembly from solved instances
    pub fn assemble(
        &self,
        name: &str,
        members: impl IntoIterator<Item = TemplateInstance>,
    ) -> Result<Assembly> {
        let mut assembly = Assembly::new(name);
        for member in members {
            assembly.add_member(member)?;
        }
        Ok(assembly)
    }

    /// Validate an assembly against the stored templates
    pub fn validate(
        &self,
        assembly: &Assembly,
        constraints: &ConstraintSet,
    ) -> std::result::Result<Certificate, ValidationReport> {
        self.validator.validate(assembly, constraints, &self.store)
    }

    /// Validate and attach the certificate on success
    pub fn certify(&self, assembly: &mut Assembly, constraints: &ConstraintSet) -> Result<Certificate> {
        let certificate = self.validate(assembly, constraints).inspect_err(|report| {
            log::info!("{}", report);
        })?;
        assembly.attach_certificate(certificate.clone())?;
        log::info!(
            "Assembly '{}' certified with {} members",
            assembly.name(),
            certificate.members.len()
        );
        Ok(certificate)
    }

    /// Hand a certified assembly to an exporter
    pub fn export(&self, assembly: &Assembly, exporter: &dyn AssemblyExporter) -> Result<()> {
        let bundle = ExportBundle::new(assembly)?;
        exporter.export(&bundle)?;
        log::info!(
            "Exported assembly '{}' ({} manifest entries)",
            assembly.name(),
            bundle.manifest.len()
        );
        Ok(())
    }

    /// Cover footprints with fixed-size modules using the configured tiling
    pub fn tile_footprint(&self, footprints: &[BoundingBox]) -> Result<Vec<ModulePlacement>> {
        let modules = tile_modules(footprints, &self.config.tiling)?;
        log::info!(
            "Tiled {} footprints with {} modules",
            footprints.len(),
            modules.len()
        );
        Ok(modules)
    }

    /// Space usage per storey of a source, read from element names
    pub fn survey(&self, source: &dyn ElementSource) -> Result<UsageSummary> {
        let normalized = self.normalizer.normalize(source)?;
        let summary = UsageSummary::of(&normalized.elements);
        log::info!(
            "Surveyed {} elements over {} storeys",
            normalized.elements.len(),
            summary.storeys.len()
        );
        Ok(summary)
    }

    /// Displacement bringing the elements of `moved` onto those of `fixed`
    pub fn align(&self, fixed: &dyn ElementSource, moved: &dyn ElementSource) -> Result<GroupAlignment> {
        let fixed = self.normalizer.normalize(fixed)?;
        let moved = self.normalizer.normalize(moved)?;
        let alignment = align_groups(&fixed.elements, &moved.elements, &self.config.alignment)?;
        log::info!(
            "Aligned on {} storeys ({} unmatched)",
            alignment.matches.len(),
            alignment.unmatched_fixed.len() + alignment.unmatched_moved.len()
        );
        Ok(alignment)
    }

    /// Snapshot the library as JSON
    pub fn flush(&self) -> Result<String> {
        Ok(self.store.to_json()?)
    }

    /// Write a library snapshot
    pub fn flush_to<W: Write>(&self, writer: W) -> Result<()> {
        self.store.to_writer(writer)?;
        Ok(())
    }

    /// Close the pipeline and hand back the store
    pub fn close(self) -> LibraryStore {
        log::info!("Pipeline closed with {} stored templates", self.store.len());
        self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PipelineError;
    use bimparam_constraints::{CompareOp, ConstraintSpec, Expr, Predicate};
    use bimparam_model::{RawElement, RawShape, RelationKind, VecSource};
    use bimparam_solver::SolveError;
    use bimparam_validator::MemoryExporter;
    use std::sync::{Arc, Mutex};

    fn column(id: &str, height: f64) -> RawElement {
        RawElement::new(id, "IfcColumn").with_shape(RawShape::Box {
            min: [0.0, 0.0, 0.0],
            max: [0.4, 0.4, height],
        })
    }

    fn columns() -> VecSource {
        VecSource::new(vec![column("C1", 3.0), column("C2", 3.05), column("C3", 3.1)])
    }

    fn open() -> Pipeline {
        Pipeline::open(PipelineConfig::default(), LibraryStore::new()).unwrap()
    }

    #[test]
    fn test_ingest_stores_templates() {
        let pipeline = open();
        let report = pipeline.ingest(&columns()).unwrap();
        assert_eq!(report.templates, vec![TemplateRef::new("column-001", 1)]);
        assert_eq!(report.assignments.len(), 3);
        assert!(report.unclustered.is_empty());
        assert_eq!(pipeline.store().len(), 1);

        // identical batch leaves the version alone
        let again = pipeline.ingest(&columns()).unwrap();
        assert_eq!(again.templates, vec![TemplateRef::new("column-001", 1)]);
    }

    #[test]
    fn test_progress_phases() {
        let phases = Arc::new(Mutex::new(Vec::new()));
        let sink = phases.clone();
        open()
            .ingest_with_progress(
                &columns(),
                Box::new(move |phase, percent| {
                    sink.lock().unwrap().push((phase.to_string(), percent));
                }),
            )
            .unwrap();
        let phases = phases.lock().unwrap();
        assert_eq!(phases.first().unwrap().1, 0.0);
        assert_eq!(phases.last().unwrap(), &("Complete".to_string(), 100.0));
    }

    #[test]
    fn test_open_rejects_invalid_config() {
        let mut config = PipelineConfig::default();
        config.recognizer.similarity_threshold = -1.0;
        assert!(matches!(
            Pipeline::open(config, LibraryStore::new()),
            Err(PipelineError::Recognize(_))
        ));
    }

    #[test]
    fn test_solve_certify_export() {
        let pipeline = open();
        pipeline.ingest(&columns()).unwrap();

        let height = ConstraintSet::new().with(ConstraintSpec::new(
            "storey",
            Predicate::equals(Expr::param("c1", "height"), 4.5, 0.0),
        ));
        let c1 = pipeline
            .reparametrize(&pipeline.request("column-001", "c1").unwrap().with_constraints(height))
            .unwrap();
        let c2 = pipeline
            .reparametrize(
                &pipeline
                    .request("column-001", "c2")
                    .unwrap()
                    .with_placement(bimparam_model::Placement::at(0.4, 0.0, 0.0)),
            )
            .unwrap();
        assert_eq!(c1.parameter("height"), Some(4.5));

        let mut assembly = pipeline.assemble("bay", [c1, c2]).unwrap();
        assembly.relate(RelationKind::Adjacency, "c1", "c2");
        let certificate = pipeline.certify(&mut assembly, &ConstraintSet::new()).unwrap();
        assert!(assembly.is_certified());
        assert_eq!(certificate.members.len(), 2);

        let exporter = MemoryExporter::new();
        pipeline.export(&assembly, &exporter).unwrap();
        assert_eq!(exporter.len(), 1);
    }

    #[test]
    fn test_resolve_uses_stored_template() {
        let pipeline = open();
        pipeline.ingest(&columns()).unwrap();
        let first = pipeline
            .reparametrize(&pipeline.request("column-001", "c1").unwrap())
            .unwrap();
        let tall = ConstraintSet::new().with(ConstraintSpec::new(
            "tall",
            Predicate::compare(Expr::param("c1", "height"), CompareOp::Ge, 5.0),
        ));
        let second = pipeline.resolve(&first, tall).unwrap();
        assert_eq!(second.id.revision, 2);
        assert_eq!(second.parameter("height"), Some(5.0));

        let impossible = ConstraintSet::new().with(ConstraintSpec::new(
            "too-tall",
            Predicate::compare(Expr::param("c1", "height"), CompareOp::Ge, 50.0),
        ));
        let err = pipeline.resolve(&first, impossible).unwrap_err();
        assert!(matches!(err, PipelineError::Solve(SolveError::Infeasible(_))));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_uncertified_export_rejected() {
        let pipeline = open();
        let assembly = Assembly::new("empty");
        assert!(matches!(
            pipeline.export(&assembly, &MemoryExporter::new()),
            Err(PipelineError::Validate(_))
        ));
    }

    #[test]
    fn test_flush_and_close() {
        let pipeline = open();
        pipeline.ingest(&columns()).unwrap();
        let json = pipeline.flush().unwrap();
        let mut buffer = Vec::new();
        pipeline.flush_to(&mut buffer).unwrap();
        assert_eq!(String::from_utf8(buffer).unwrap(), json);

        let store = pipeline.close();
        let reopened = LibraryStore::from_json(&json).unwrap();
        assert_eq!(reopened.identities(), store.identities());
    }

    #[test]
    fn test_tile_footprint() {
        let pipeline = open();
        let footprint = BoundingBox::new([0.0, 0.0, 0.0], [20.0, 8.0, 3.0]);
        let modules = pipeline.tile_footprint(&[footprint]).unwrap();
        assert!(!modules.is_empty());
        assert!(modules.iter().all(|m| m.overlap_ratio > 0.01));
    }

    fn storeys(offset: [f64; 3], suffix: &str) -> VecSource {
        VecSource::new(
            (0..2)
                .map(|level| {
                    let z = offset[2] + level as f64 * 3.0;
                    RawElement::new(format!("S{}", level), "IfcSlab")
                        .with_name("Plancher")
                        .with_storey(format!("NIVEAU {}{}", level, suffix))
                        .with_shape(RawShape::Box {
                            min: [offset[0], offset[1], z],
                            max: [offset[0] + 12.0, offset[1] + 6.0, z + 0.25],
                        })
                })
                .collect(),
        )
    }

    #[test]
    fn test_survey() {
        let pipeline = open();
        let summary = pipeline.survey(&storeys([0.0; 3], "")).unwrap();
        assert_eq!(summary.storeys.len(), 2);
        assert_eq!(
            summary
                .storey("NIVEAU 1")
                .unwrap()
                .count(bimparam_normalizer::UsageCategory::Floor),
            1
        );
    }

    #[test]
    fn test_align() {
        let pipeline = open();
        let alignment = pipeline
            .align(&storeys([0.0; 3], ""), &storeys([30.0, 0.0, -2.0], ".001"))
            .unwrap();
        assert_eq!(alignment.matches.len(), 2);
        assert_eq!(alignment.recommended, [-30.0, 0.0, 2.0]);
        assert!(alignment.consistent);

        let err = pipeline
            .align(&storeys([0.0; 3], ""), &VecSource::new(vec![column("C1", 3.0)]))
            .unwrap_err();
        assert!(matches!(err, PipelineError::Geometry(_)));
        assert!(!err.is_fatal());
    }
}
