//! AI 模块：带机会节点的期望极小化极大搜索。

pub mod expectiminimax;

pub use expectiminimax::{
    AiAgent, AiConfig, AiDecision, AiDifficulty, Expectiminimax, SearchResult, SearchStats,
};
