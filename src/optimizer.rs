// ============================================================================
// SECTION 14: OPTIMIZER
// ============================================================================
// Stateless threshold rule engine. Every operation is a pure function of its
// inputs and the immutable `OptimizerConfig`; absent metrics never breach.
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use crate::config::OptimizerConfig;
use crate::types::{MetricSample, MetricSeries, Priority, Timestamp, TrackedMetric};

// ----------------------------------------------------------------------------
// 14.1 Rule Payloads
// ----------------------------------------------------------------------------

/// Overall health band of an analysis score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PerformanceStatus {
    Excellent,
    Good,
    Poor,
}

/// A threshold breach found in a sample
///
/// Serialized as its display label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Issue {
    #[serde(rename = "High CPU usage")]
    HighCpuUsage,
    #[serde(rename = "High memory usage")]
    HighMemoryUsage,
    #[serde(rename = "Slow response times")]
    SlowResponseTimes,
    #[serde(rename = "High error rate")]
    HighErrorRate,
}

impl Issue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Issue::HighCpuUsage => "High CPU usage",
            Issue::HighMemoryUsage => "High memory usage",
            Issue::SlowResponseTimes => "Slow response times",
            Issue::HighErrorRate => "High error rate",
        }
    }

    pub fn category(&self) -> OptimizationCategory {
        match self {
            Issue::HighCpuUsage => OptimizationCategory::CpuOptimization,
            Issue::HighMemoryUsage => OptimizationCategory::MemoryOptimization,
            Issue::SlowResponseTimes => OptimizationCategory::PerformanceOptimization,
            Issue::HighErrorRate => OptimizationCategory::ReliabilityOptimization,
        }
    }
}

impl std::fmt::Display for Issue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scored health analysis of one sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub score: f64,
    pub status: PerformanceStatus,
    pub issues: SmallVec<[Issue; 4]>,
    pub metrics: MetricSample,
}

impl Analysis {
    pub fn issue_texts(&self) -> Vec<&'static str> {
        self.issues.iter().map(Issue::as_str).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationCategory {
    CpuOptimization,
    MemoryOptimization,
    PerformanceOptimization,
    ReliabilityOptimization,
}

impl OptimizationCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            OptimizationCategory::CpuOptimization => "cpu_optimization",
            OptimizationCategory::MemoryOptimization => "memory_optimization",
            OptimizationCategory::PerformanceOptimization => "performance_optimization",
            OptimizationCategory::ReliabilityOptimization => "reliability_optimization",
        }
    }
}

/// Remediation for one issue category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    #[serde(rename = "type")]
    pub category: OptimizationCategory,
    pub priority: Priority,
    pub description: String,
    pub actions: Vec<String>,
}

impl Recommendation {
    fn new(category: OptimizationCategory, priority: Priority, description: &str, actions: [&str; 3]) -> Self {
        Self {
            category,
            priority,
            description: description.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

/// Additive estimate of what applying a recommendation set buys
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactEstimate {
    pub performance_improvement: u32,
    pub cost_reduction: u32,
    pub reliability_improvement: u32,
    pub estimated_timeframe: String,
}

/// Coarse advisory from the realtime "optimize" report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    pub category: String,
    pub priority: Priority,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub timestamp: Timestamp,
    pub recommendations: Vec<Advisory>,
    pub metrics_analyzed: MetricSample,
    pub total_recommendations: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opportunities {
    pub cost_savings: String,
    pub performance_gains: String,
    pub reliability_improvements: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionItem {
    pub action: String,
    pub priority: Priority,
    pub timeline: String,
    pub impact: String,
}

// ----------------------------------------------------------------------------
// 14.2 Optimizer
// ----------------------------------------------------------------------------

/// Threshold-driven recommendation engine.
#[derive(Debug, Clone, Default)]
pub struct Optimizer {
    config: OptimizerConfig,
}

impl Optimizer {
    pub fn new(config: OptimizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &OptimizerConfig {
        &self.config
    }

    /// Always ready; holds no trained state
    pub fn is_ready(&self) -> bool {
        true
    }

    fn breaches(&self, sample: &MetricSample) -> SmallVec<[Issue; 4]> {
        let over = |metric: TrackedMetric, threshold: f64| {
            sample.get(metric).map_or(false, |v| v > threshold)
        };

        let mut issues = SmallVec::new();
        if over(TrackedMetric::CpuUsage, self.config.cpu_threshold) {
            issues.push(Issue::HighCpuUsage);
        }
        if over(TrackedMetric::MemoryUsage, self.config.memory_threshold) {
            issues.push(Issue::HighMemoryUsage);
        }
        if over(TrackedMetric::ResponseTime, self.config.response_time_threshold) {
            issues.push(Issue::SlowResponseTimes);
        }
        if over(TrackedMetric::ErrorRate, self.config.error_rate_threshold) {
            issues.push(Issue::HighErrorRate);
        }
        issues
    }

    fn penalty(&self, issue: Issue) -> f64 {
        match issue {
            Issue::HighCpuUsage => self.config.cpu_penalty,
            Issue::HighMemoryUsage => self.config.memory_penalty,
            Issue::SlowResponseTimes => self.config.response_time_penalty,
            Issue::HighErrorRate => self.config.error_rate_penalty,
        }
    }

    /// 100 minus the penalty of every breached threshold, floored at 0
    pub fn optimization_score(&self, sample: &MetricSample) -> f64 {
        let penalties: f64 = self.breaches(sample).iter().map(|i| self.penalty(*i)).sum();
        (100.0 - penalties).max(0.0)
    }

    pub fn analyze_performance(&self, sample: &MetricSample) -> Analysis {
        let issues = self.breaches(sample);
        let score = self.optimization_score(sample);
        let status = if score >= self.config.excellent_score {
            PerformanceStatus::Excellent
        } else if score >= self.config.good_score {
            PerformanceStatus::Good
        } else {
            PerformanceStatus::Poor
        };

        debug!(
            target: "cortex::optimizer",
            score,
            issues = issues.len(),
            "Performance analyzed"
        );

        Analysis {
            score,
            status,
            issues,
            metrics: sample.clone(),
        }
    }

    /// Realtime advisories for cpu, memory and response-time breaches
    pub fn optimize_performance(&self, sample: &MetricSample) -> OptimizeReport {
        let recommendations: Vec<Advisory> = self
            .breaches(sample)
            .into_iter()
            .filter_map(|issue| {
                let (category, priority, message) = match issue {
                    Issue::HighCpuUsage => (
                        "cpu",
                        Priority::High,
                        "High CPU usage detected. Consider scaling horizontally or optimizing algorithms.",
                    ),
                    Issue::HighMemoryUsage => (
                        "memory",
                        Priority::High,
                        "High memory usage detected. Consider implementing caching strategies.",
                    ),
                    Issue::SlowResponseTimes => (
                        "performance",
                        Priority::Medium,
                        "Slow response times detected. Consider database optimization or caching.",
                    ),
                    Issue::HighErrorRate => return None,
                };
                Some(Advisory {
                    category: category.to_string(),
                    priority,
                    message: message.to_string(),
                })
            })
            .collect();

        OptimizeReport {
            timestamp: sample.timestamp,
            total_recommendations: recommendations.len(),
            recommendations,
            metrics_analyzed: sample.clone(),
        }
    }

    /// One recommendation per distinct issue category, in issue order
    pub fn suggest_optimizations(&self, analysis: &Analysis) -> Vec<Recommendation> {
        let mut seen: SmallVec<[OptimizationCategory; 4]> = SmallVec::new();
        let mut suggestions = Vec::new();

        for issue in &analysis.issues {
            let category = issue.category();
            if seen.contains(&category) {
                continue;
            }
            seen.push(category);
            suggestions.push(recommendation_for(category));
        }
        suggestions
    }

    pub fn predict_impact(&self, recommendations: &[Recommendation]) -> ImpactEstimate {
        let mut impact = ImpactEstimate {
            performance_improvement: 0,
            cost_reduction: 0,
            reliability_improvement: 0,
            estimated_timeframe: "1-2 weeks".to_string(),
        };

        for rec in recommendations {
            match rec.category {
                OptimizationCategory::CpuOptimization => {
                    impact.performance_improvement += 15;
                    impact.cost_reduction += 10;
                }
                OptimizationCategory::MemoryOptimization => {
                    impact.performance_improvement += 12;
                    impact.cost_reduction += 8;
                }
                OptimizationCategory::PerformanceOptimization => {
                    impact.performance_improvement += 20;
                }
                OptimizationCategory::ReliabilityOptimization => {
                    impact.reliability_improvement += 25;
                }
            }
        }
        impact
    }

    /// Stable sort, critical first
    pub fn prioritize_optimizations(&self, mut recommendations: Vec<Recommendation>) -> Vec<Recommendation> {
        recommendations.sort_by_key(|r| r.priority.rank());
        recommendations
    }

    /// Advisories for forecast horizons whose mean crosses a capacity limit
    pub fn get_recommendations(&self, predictions: &BTreeMap<TrackedMetric, Vec<f64>>) -> Vec<String> {
        predictions
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .filter_map(|(metric, values)| {
                let avg = values.iter().sum::<f64>() / values.len() as f64;
                match metric {
                    TrackedMetric::ResponseTime if avg > self.config.forecast_response_time_limit => Some(format!(
                        "Response time predicted to be {avg:.0}ms. Consider performance optimization."
                    )),
                    TrackedMetric::ActiveUsers if avg > self.config.forecast_active_users_limit => Some(format!(
                        "High user load predicted ({avg:.0} users). Plan for scaling."
                    )),
                    TrackedMetric::CpuUsage if avg > self.config.forecast_cpu_limit => Some(format!(
                        "CPU usage predicted to reach {avg:.1}%. Consider resource scaling."
                    )),
                    _ => None,
                }
            })
            .collect()
    }

    pub fn find_opportunities(&self, _history: &MetricSeries) -> Opportunities {
        Opportunities {
            cost_savings: "Database query optimization could reduce costs by 15%".to_string(),
            performance_gains: "Caching implementation could improve response times by 30%".to_string(),
            reliability_improvements: "Error handling enhancements could reduce failures by 50%".to_string(),
            confidence: 0.8,
        }
    }

    pub fn generate_action_plan(&self) -> Vec<ActionItem> {
        let item = |action: &str, priority, timeline: &str, impact: &str| ActionItem {
            action: action.to_string(),
            priority,
            timeline: timeline.to_string(),
            impact: impact.to_string(),
        };

        vec![
            item(
                "Implement performance monitoring",
                Priority::High,
                "1 week",
                "Improved visibility into system performance",
            ),
            item(
                "Optimize database queries",
                Priority::Medium,
                "2 weeks",
                "Reduced response times and resource usage",
            ),
            item(
                "Implement caching strategy",
                Priority::Medium,
                "1 week",
                "Improved performance and reduced load",
            ),
        ]
    }

    /// Configured placeholder; not derived from the sample
    pub fn current_optimization_score(&self, _sample: &MetricSample) -> f64 {
        self.config.placeholder_score
    }
}

fn recommendation_for(category: OptimizationCategory) -> Recommendation {
    match category {
        OptimizationCategory::CpuOptimization => Recommendation::new(
            category,
            Priority::High,
            "Implement CPU optimization strategies",
            ["Scale horizontally", "Optimize algorithms", "Use caching"],
        ),
        OptimizationCategory::MemoryOptimization => Recommendation::new(
            category,
            Priority::High,
            "Reduce memory consumption",
            [
                "Implement memory pooling",
                "Use efficient data structures",
                "Add garbage collection",
            ],
        ),
        OptimizationCategory::PerformanceOptimization => Recommendation::new(
            category,
            Priority::Medium,
            "Improve response times",
            ["Database indexing", "CDN implementation", "Code optimization"],
        ),
        OptimizationCategory::ReliabilityOptimization => Recommendation::new(
            category,
            Priority::Critical,
            "Reduce error rates",
            [
                "Error handling improvement",
                "Input validation",
                "Testing enhancement",
            ],
        ),
    }
}
