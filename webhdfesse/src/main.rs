/*
   Copyright 2021 Ivan Boldyrev

   Licensed under the Apache License, Version 2.0 (the "License");
   you may not use this file except in compliance with the License.
   You may obtain a copy of the License at

       http://www.apache.org/licenses/LICENSE-2.0

   Unless required by applicable law or agreed to in writing, software
   distributed under the License is distributed on an "AS IS" BASIS,
   WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
   See the License for the specific language governing permissions and
   limitations under the License.
*/
mod cli;
use anyhow::{Context, Result};
use cli::Command;
use libwebhdfesse::config::{get_config_path, ClientConfig, DEFAULT_PORT};
use libwebhdfesse::{util, WebHdfs};
use structopt::StructOpt;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[derive(StructOpt)]
struct WebhdfesseApp {
    /// NameNode HTTP address as host[:port].  Taken from hdfs-site.xml
    /// when omitted.
    #[structopt(long)]
    namenode: Option<String>,
    #[structopt(long)]
    nameservice: Option<String>,
    #[structopt(long)]
    user: Option<String>,
    #[structopt(long)]
    doas: Option<String>,
    #[structopt(long, help = "Talk to an HttpFS gateway instead of a NameNode")]
    httpfs: bool,
    #[structopt(long, help = "JMX endpoint that always reaches the active NameNode, such as a load balancer")]
    jmx: Option<String>,
    #[structopt(long)]
    gateway: Option<String>,
    #[structopt(subcommand)]
    subcmd: TopSubcmd,
}

// The name is not visible in the command line.
#[derive(StructOpt)]
enum TopSubcmd {
    Dfs(Dfs),
}

#[derive(StructOpt)]
enum Dfs {
    #[structopt(name = "-ls")]
    Ls(cli::ls::LsArgs),
    #[structopt(name = "-mkdir")]
    Mkdir(cli::mkdir::MkdirArgs),
    #[structopt(name = "-rm")]
    Rm(cli::rm::RmArgs),
    #[structopt(name = "-mv")]
    Mv(cli::mv::MvArgs),
    #[structopt(name = "-cat")]
    Cat(cli::cat::CatArgs),
    #[structopt(name = "-put")]
    Put(cli::put::PutArgs),
    #[structopt(name = "-chmod")]
    Chmod(cli::chmod::ChmodArgs),
    #[structopt(name = "-stat")]
    Stat(cli::stat::StatArgs),
}

fn parse_namenode(namenode: &str) -> Result<(String, u16)> {
    match namenode.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse()
                .with_context(|| format!("invalid namenode port in {:?}", namenode))?;
            Ok((host.to_owned(), port))
        }
        None => Ok((namenode.to_owned(), DEFAULT_PORT)),
    }
}

fn build_config(opt: &WebhdfesseApp) -> Result<ClientConfig> {
    let mut config = match &opt.namenode {
        Some(namenode) => {
            let (host, port) = parse_namenode(namenode)?;
            ClientConfig::new(host, port)
        }
        None => {
            let path = get_config_path();
            ClientConfig::from_hadoop_config(&path, opt.nameservice.as_deref())
                .with_context(|| format!("failed to load {}", path.display()))?
        }
    };

    config.username = opt.user.clone().or_else(util::current_username);
    config.doas = opt.doas.clone();
    config.httpfs_mode = opt.httpfs;
    if let Some(jmx) = &opt.jmx {
        config.jmx_host = Some(jmx.clone());
    }
    config.gateway_prefix = opt.gateway.clone();
    Ok(config)
}

fn init_tracing() -> Result<()> {
    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(tracing_tree::HierarchicalLayer::new(2));
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn main() -> Result<()> {
    init_tracing()?;
    let opt = WebhdfesseApp::from_args();

    let config = build_config(&opt)?;
    let hdfs = WebHdfs::new(config)?;

    let code = match opt.subcmd {
        TopSubcmd::Dfs(dfs) => match dfs {
            Dfs::Ls(args) => cli::ls::Ls::new(&hdfs).run(args)?,
            Dfs::Mkdir(args) => cli::mkdir::Mkdir::new(&hdfs).run(args)?,
            Dfs::Rm(args) => cli::rm::Rm::new(&hdfs).run(args)?,
            Dfs::Mv(args) => cli::mv::Mv::new(&hdfs).run(args)?,
            Dfs::Cat(args) => cli::cat::Cat::new(&hdfs).run(args)?,
            Dfs::Put(args) => cli::put::Put::new(&hdfs).run(args)?,
            Dfs::Chmod(args) => cli::chmod::Chmod::new(&hdfs).run(args)?,
            Dfs::Stat(args) => cli::stat::Stat::new(&hdfs).run(args)?,
        },
    };
    std::process::exit(code)
}
