use std::fmt;

/// Dynamic instruction mix of one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Analysis {
    pub i_count: u64,
    /// R-type and I-type arithmetic
    pub ir_count: u64,
    pub ld_count: u64,
    pub st_count: u64,
    /// JAL and JALR
    pub j_count: u64,
    pub b_taken: u64,
    pub b_not_taken: u64,
}

impl Analysis {
    pub fn branches(&self) -> u64 {
        self.b_taken + self.b_not_taken
    }
}

fn pct(numer: u64, denom: u64) -> f64 {
    if denom == 0 {
        0.0
    } else {
        numer as f64 / denom as f64 * 100.0
    }
}

impl fmt::Display for Analysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let total = self.i_count;
        let b_total = self.branches();
        writeln!(f, "=== Analysis")?;
        writeln!(f, "Instructions Executed  = {}", total)?;
        let rows = [
            ("R-type + I-type        ", self.ir_count, total),
            ("Loads                  ", self.ld_count, total),
            ("Stores                 ", self.st_count, total),
            ("Jumps/JAL/JALR         ", self.j_count, total),
            ("Conditional branches   ", b_total, total),
            ("  Branches taken       ", self.b_taken, b_total),
            ("  Branches not taken   ", self.b_not_taken, b_total),
        ];
        for (i, (label, n, denom)) in rows.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}= {} ({:.2}%)", label, n, pct(*n, *denom))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_percentages() {
        let a = Analysis {
            i_count: 10,
            ir_count: 5,
            ld_count: 1,
            st_count: 1,
            j_count: 1,
            b_taken: 1,
            b_not_taken: 1,
        };
        let text = a.to_string();
        assert!(text.contains("Instructions Executed  = 10\n"));
        assert!(text.contains("R-type + I-type        = 5 (50.00%)"));
        assert!(text.contains("Conditional branches   = 2 (20.00%)"));
        assert!(text.contains("  Branches taken       = 1 (50.00%)"));
    }

    #[test]
    fn empty_run_has_no_nan() {
        let text = Analysis::default().to_string();
        assert!(!text.contains("NaN"));
        assert!(text.contains("Loads                  = 0 (0.00%)"));
    }
}
