//! Fee structure resolution and validation.

use tuition_shared::types::SchoolId;

use crate::error::FeeError;
use crate::fee_structure::types::{CreateFeeStructureInput, FeeStructure};

/// Maximum length of an academic year label.
const MAX_ACADEMIC_YEAR_LEN: usize = 20;

/// Picks the single active fee structure for a school, grade and year.
pub struct FeeStructureResolver;

impl FeeStructureResolver {
    /// Resolves the active structure among `candidates`.
    ///
    /// # Returns
    /// * `Ok(structure)` if exactly one active structure matches
    /// * `Err(FeeError::NotFound)` if none does
    /// * `Err(FeeError::DataIntegrity)` if more than one does
    pub fn resolve<'a>(
        candidates: &'a [FeeStructure],
        school_id: SchoolId,
        grade_level: u8,
        academic_year: &str,
    ) -> Result<&'a FeeStructure, FeeError> {
        let mut matches = candidates
            .iter()
            .filter(|s| s.is_active && s.matches(school_id, grade_level, academic_year));

        let Some(first) = matches.next() else {
            return Err(FeeError::not_found(
                "fee_structure",
                format!("school {school_id} grade {grade_level} year {academic_year}"),
            ));
        };

        let extra = matches.count();
        if extra > 0 {
            return Err(FeeError::DataIntegrity {
                constraint: "one_active_fee_structure",
                detail: format!(
                    "{} active structures for school {school_id} grade {grade_level} year {academic_year}",
                    extra + 1
                ),
            });
        }

        Ok(first)
    }
}

/// Validation rules for fee structure definitions.
pub struct FeeStructureService;

impl FeeStructureService {
    /// Validates a fee structure definition.
    ///
    /// # Errors
    ///
    /// Returns `FeeError::Validation` for a blank or overlong academic year,
    /// no priced frequency, or any negative amount.
    pub fn validate(input: &CreateFeeStructureInput) -> Result<(), FeeError> {
        let year = input.academic_year.trim();
        if year.is_empty() || year.len() > MAX_ACADEMIC_YEAR_LEN {
            return Err(FeeError::validation(
                "academic_year",
                "must be 1-20 characters",
                &input.academic_year,
            ));
        }

        let pricings = [
            ("monthly.base_amount", input.monthly),
            ("termly.base_amount", input.termly),
            ("yearly.base_amount", input.yearly),
        ];
        if pricings.iter().all(|(_, p)| p.is_none()) {
            return Err(FeeError::validation(
                "frequency",
                "at least one frequency must be priced",
                "none",
            ));
        }
        for (field, pricing) in pricings {
            if let Some(p) = pricing {
                FeeError::check_amount(field, p.base_amount)?;
            }
        }

        FeeError::check_amount("material_fee", input.material_fee)?;
        FeeError::check_amount("other_fees", input.other_fees)?;
        Ok(())
    }
}
