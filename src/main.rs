use masque_viewer::{StageConfig, run};

fn main() -> anyhow::Result<()> {
    run(StageConfig::default())
}
