use heatisle_dataset::FeatureSet;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct KeysArg {
    /// Feature set (default or withterrain)
    #[arg(long, default_value = "default")]
    feature_set: FeatureSet,
}

pub(crate) fn run(arg: &KeysArg) {
    for key in arg.feature_set.keys() {
        println!("{key}");
    }
}
