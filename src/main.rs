use flow_playground::PlaygroundConfig;

fn main() -> anyhow::Result<()> {
    flow_playground::run(PlaygroundConfig::from_env())
}
